//! Store error types
//!
//! Every variant means the entries file is unavailable: it could not be read,
//! decoded, or replaced. Callers surface these as-is and never retry.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The file does not exist and the store is not allowed to create it
    #[error("hosts file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content is not valid UTF-8
    #[error("invalid data in {}: {message}", path.display())]
    InvalidData { path: PathBuf, message: String },

    #[error("failed to create temp file for {}: {source}", path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sync {}: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set permissions on {}: {source}", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the file the failed operation targeted
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::Read { path, .. }
            | Self::InvalidData { path, .. }
            | Self::TempFile { path, .. }
            | Self::Write { path, .. }
            | Self::Sync { path, .. }
            | Self::Permissions { path, .. } => path,
            Self::Rename { to, .. } => to,
        }
    }
}
