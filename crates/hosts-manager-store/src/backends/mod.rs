//! [`HostsFileIo`](crate::HostsFileIo) implementations

pub mod fs;
pub mod memory;

pub use fs::FsHostsFileIo;
pub use memory::MemoryHostsFileIo;
