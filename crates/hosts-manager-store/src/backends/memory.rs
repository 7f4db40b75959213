//! In-memory backend
//!
//! Holds file contents in a map. Used by tests to simulate other writers and
//! failing disks without touching the filesystem.

use crate::error::StoreError;
use crate::traits::HostsFileIo;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryHostsFileIo {
    files: Mutex<HashMap<PathBuf, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryHostsFileIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding one file
    pub fn with_file(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let io = Self::new();
        io.set(path, text);
        io
    }

    /// Replace a file's content directly, bypassing write accounting
    pub fn set(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.lock().insert(path.into(), text.into());
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful atomic writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl HostsFileIo for MemoryHostsFileIo {
    fn read_all_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::read(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "injected read failure"),
            ));
        }
        Ok(self.get(path))
    }

    fn write_all_text_atomic(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::write(
                path,
                io::Error::new(io::ErrorKind::Other, "injected write failure"),
            ));
        }
        self.files
            .lock()
            .insert(path.to_path_buf(), text.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
