pub mod local;
pub mod memory;
pub mod path;

use std::io;
use std::time::SystemTime;
use tokio::io::AsyncRead;

pub use local::LocalVfs;
pub use memory::MemoryVfs;

pub type VfsReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMeta {
    pub is_dir: bool,
    pub size: u64,  // in bytes, 0 for directories
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsDirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read-only view of a virtual filesystem.
///
/// Paths are absolute, `/`-separated and already normalized (see [`path::join_checked`]).
#[async_trait::async_trait]
pub trait Vfs: Send + Sync {
    /// `Ok(None)` when nothing exists at `path`.
    async fn stat(&self, path: &str) -> io::Result<Option<VfsMeta>>;

    /// Children of a directory, in the order they should be archived.
    async fn readdir(&self, path: &str) -> io::Result<Vec<VfsDirEntry>>;

    async fn read_file(&self, path: &str) -> io::Result<VfsReader>;
}
