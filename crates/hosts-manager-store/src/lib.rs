//! Storage layer for hosts-manager
//!
//! Provides whole-file access to a line-oriented hosts file and an in-memory
//! view that can be mutated and written back atomically.
//!
//! # Architecture
//!
//! - [`HostsFileIo`] - read/replace the whole file (the only I/O seam)
//! - [`EntriesStore`] - parsed view with load, append, update, remove and save
//! - [`backends`] - `std::fs` and in-memory implementations of [`HostsFileIo`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hosts_manager_common::Entry;
//! use hosts_manager_store::{EntriesStore, FsHostsFileIo, StoreOptions};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = EntriesStore::load(
//!     Arc::new(FsHostsFileIo::new()),
//!     "/etc/hosts",
//!     StoreOptions::default(),
//! )?;
//! store.append(Entry::new("10.0.0.5", "staging.local"));
//! store.save()?;
//! # Ok(())
//! # }
//! ```

mod error;
mod parser;
mod store;
mod traits;

pub mod backends;

pub use backends::{FsHostsFileIo, MemoryHostsFileIo};
pub use error::StoreError;
pub use parser::{parse_line, LineEnding};
pub use store::{EntriesStore, EntryHandle, StoreOptions};
pub use traits::HostsFileIo;
