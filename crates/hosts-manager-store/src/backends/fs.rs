//! Filesystem backend
//!
//! # Atomic Writes
//!
//! The entries file is replaced atomically:
//! 1. Write the new text to a temporary sibling file
//! 2. Sync it to disk with fsync
//! 3. Copy the permissions of the file being replaced
//! 4. Rename over the target (atomic on POSIX systems)
//!
//! The temporary file lives in the same directory as the target so the rename
//! never crosses filesystems. Its name carries the process id and a per-call
//! counter, and it is created exclusively, so concurrent writers never share
//! a temp file.

use crate::error::StoreError;
use crate::traits::HostsFileIo;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`HostsFileIo`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsHostsFileIo;

impl FsHostsFileIo {
    pub fn new() -> Self {
        Self
    }
}

impl HostsFileIo for FsHostsFileIo {
    fn read_all_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::read(path, e)),
        };

        let text = String::from_utf8(bytes).map_err(|e| StoreError::InvalidData {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), bytes = text.len(), "Read hosts file");
        Ok(Some(text))
    }

    fn write_all_text_atomic(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let temp_path = temp_path_for(path);

        if let Err(e) = write_temp_and_rename(path, &temp_path, text.as_bytes()) {
            // A failed exclusive create means the file belongs to someone else
            if !matches!(e, StoreError::TempFile { .. }) && temp_path.exists() {
                if let Err(cleanup) = fs::remove_file(&temp_path) {
                    warn!(
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Failed to remove temp file after failed write"
                    );
                }
            }
            return Err(e);
        }

        debug!(path = %path.display(), bytes = text.len(), "Wrote hosts file");
        Ok(())
    }
}

/// Hidden sibling of `target`, unique per call
fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hosts".to_string());
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), n))
}

fn write_temp_and_rename(target: &Path, temp_path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .map_err(|e| StoreError::TempFile {
            path: target.to_path_buf(),
            source: e,
        })?;

    file.write_all(content)
        .map_err(|e| StoreError::write(target, e))?;

    file.sync_all().map_err(|e| StoreError::Sync {
        path: target.to_path_buf(),
        source: e,
    })?;

    // Keep the mode of the file being replaced; new files get the default
    match fs::metadata(target) {
        Ok(metadata) => {
            fs::set_permissions(temp_path, metadata.permissions()).map_err(|e| {
                StoreError::Permissions {
                    path: target.to_path_buf(),
                    source: e,
                }
            })?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::read(target, e)),
    }

    fs::rename(temp_path, target).map_err(|e| StoreError::Rename {
        from: temp_path.to_path_buf(),
        to: target.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let io = FsHostsFileIo::new();
        let result = io.read_all_text(&temp_dir.path().join("hosts")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let io = FsHostsFileIo::new();
        let err = io.read_all_text(temp_dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        fs::write(&path, [0x31, 0xff, 0xfe, 0x0a]).unwrap();

        let err = FsHostsFileIo::new().read_all_text(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData { .. }));
    }

    #[test]
    fn test_write_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        let io = FsHostsFileIo::new();

        io.write_all_text_atomic(&path, "127.0.0.1 localhost\n")
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "127.0.0.1 localhost\n");
    }

    #[test]
    fn test_write_overwrites_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        fs::write(&path, "old content\n").unwrap();

        let io = FsHostsFileIo::new();
        io.write_all_text_atomic(&path, "new content\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new content\n");
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_into_missing_directory_fails_without_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("hosts");

        let err = FsHostsFileIo::new()
            .write_all_text_atomic(&path, "content\n")
            .unwrap_err();

        assert!(matches!(err, StoreError::TempFile { .. }));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        FsHostsFileIo::new()
            .write_all_text_atomic(&path, "new\n")
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/etc/hosts"));
        assert_eq!(temp.parent(), Some(Path::new("/etc")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".hosts."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_temp_path_differs_per_call() {
        let target = Path::new("/etc/hosts");
        assert_ne!(temp_path_for(target), temp_path_for(target));
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_writes_do_not_share_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        let texts: Vec<String> = (0..8)
            .map(|i| format!("10.0.0.{} host{}.local\n", i, i).repeat(200))
            .collect();

        std::thread::scope(|scope| {
            for text in &texts {
                let path = &path;
                scope.spawn(move || {
                    FsHostsFileIo::new()
                        .write_all_text_atomic(path, text)
                        .unwrap();
                });
            }
        });

        // Whichever writer renamed last wins, but never a mix of two
        let content = fs::read_to_string(&path).unwrap();
        assert!(texts.contains(&content));
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
