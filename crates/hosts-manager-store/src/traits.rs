//! File I/O seam used by [`EntriesStore`](crate::EntriesStore)

use crate::error::StoreError;
use std::path::Path;

/// Whole-file access to an entries file
///
/// Implementations must make `write_all_text_atomic` all-or-nothing: either
/// the complete new text replaces the file, or the old file is left as it was.
pub trait HostsFileIo: Send + Sync {
    /// Read the whole file
    ///
    /// Returns `Ok(None)` if the file does not exist.
    fn read_all_text(&self, path: &Path) -> Result<Option<String>, StoreError>;

    /// Replace the whole file with `text`
    fn write_all_text_atomic(&self, path: &Path, text: &str) -> Result<(), StoreError>;
}
