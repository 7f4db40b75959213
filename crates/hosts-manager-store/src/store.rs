//! In-memory view of one entries file
//!
//! [`EntriesStore`] is loaded fresh for every operation, mutated as a working
//! copy, and written back as a whole. Lines that are not entries (blank lines,
//! comments, malformed lines) are kept verbatim and in place. Entries that are
//! never touched are written back exactly as they were read.

use crate::error::StoreError;
use crate::parser::{parse_line, split_lines, LineEnding};
use crate::traits::HostsFileIo;
use hosts_manager_common::Entry;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Load behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    /// Treat a missing file as empty instead of failing
    pub create_if_missing: bool,
}

/// Identity of one entry inside a loaded store
///
/// Handles stay valid for the lifetime of the store they came from, including
/// after other entries are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(usize);

#[derive(Debug, Clone)]
enum Slot {
    /// `raw` holds the original text until the entry is modified
    Entry { entry: Entry, raw: Option<String> },
    Text(String),
    Removed,
}

#[derive(Clone)]
pub struct EntriesStore {
    io: Arc<dyn HostsFileIo>,
    path: PathBuf,
    slots: Vec<Slot>,
    line_ending: LineEnding,
    trailing_newline: bool,
}

impl EntriesStore {
    /// Read and parse the file at `path`
    pub fn load(
        io: Arc<dyn HostsFileIo>,
        path: impl Into<PathBuf>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let path = path.into();

        let text = match io.read_all_text(&path)? {
            Some(text) => text,
            None if options.create_if_missing => {
                debug!(path = %path.display(), "Hosts file missing, starting empty");
                String::new()
            }
            None => return Err(StoreError::NotFound { path }),
        };

        let store = Self::parse(io, path, &text);
        debug!(
            path = %store.path.display(),
            entries = store.len(),
            lines = store.slots.len(),
            "Loaded hosts file"
        );
        Ok(store)
    }

    fn parse(io: Arc<dyn HostsFileIo>, path: PathBuf, text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        let (lines, trailing_newline) = split_lines(text);

        let slots = lines
            .into_iter()
            .enumerate()
            .map(|(i, raw)| match parse_line(raw, i + 1) {
                Some(entry) => Slot::Entry {
                    entry,
                    raw: Some(raw.to_string()),
                },
                None => Slot::Text(raw.to_string()),
            })
            .collect();

        Self {
            io,
            path,
            slots,
            line_ending,
            trailing_newline,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live entries in file order
    pub fn entries(&self) -> impl Iterator<Item = (EntryHandle, &Entry)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Entry { entry, .. } => Some((EntryHandle(i), entry)),
            _ => None,
        })
    }

    /// Owned copy of the live entries in file order
    pub fn to_entries(&self) -> Vec<Entry> {
        self.entries().map(|(_, entry)| entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&Entry> {
        match self.slots.get(handle.0) {
            Some(Slot::Entry { entry, .. }) => Some(entry),
            _ => None,
        }
    }

    /// Add an entry after the last line
    ///
    /// The entry has no line number until the store is saved and reloaded.
    pub fn append(&mut self, mut entry: Entry) -> EntryHandle {
        entry.line = None;
        self.slots.push(Slot::Entry { entry, raw: None });
        EntryHandle(self.slots.len() - 1)
    }

    /// Overwrite address, hostname, comment and enabled flag in place
    ///
    /// Returns false if the handle does not refer to a live entry.
    pub fn update(&mut self, handle: EntryHandle, fields: &Entry) -> bool {
        match self.slots.get_mut(handle.0) {
            Some(Slot::Entry { entry, raw }) => {
                entry.assign_fields(fields);
                *raw = None;
                true
            }
            _ => false,
        }
    }

    /// Remove the entry behind `handle`
    pub fn remove(&mut self, handle: EntryHandle) -> Option<Entry> {
        let slot = self.slots.get_mut(handle.0)?;
        if !matches!(slot, Slot::Entry { .. }) {
            return None;
        }
        match std::mem::replace(slot, Slot::Removed) {
            Slot::Entry { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// Full file text as it would be written by [`save`](Self::save)
    pub fn render(&self) -> String {
        let ending = self.line_ending.as_str();
        let lines: Vec<String> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Entry { raw: Some(raw), .. } => Some(raw.clone()),
                Slot::Entry { entry, raw: None } => Some(entry.canonical()),
                Slot::Text(text) => Some(text.clone()),
                Slot::Removed => None,
            })
            .collect();

        let mut text = lines.join(ending);
        if self.trailing_newline && !lines.is_empty() {
            text.push_str(ending);
        }
        text
    }

    /// Atomically replace the file with the current content
    ///
    /// Consumes the store: line numbers are stale once the file is rewritten.
    /// Returns the number of entries written.
    pub fn save(self) -> Result<usize, StoreError> {
        let text = self.render();
        let count = self.len();
        self.io.write_all_text_atomic(&self.path, &text)?;
        debug!(path = %self.path.display(), entries = count, "Saved hosts file");
        Ok(count)
    }
}

impl fmt::Debug for EntriesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntriesStore")
            .field("path", &self.path)
            .field("slots", &self.slots)
            .field("line_ending", &self.line_ending)
            .field("trailing_newline", &self.trailing_newline)
            .finish_non_exhaustive()
    }
}
