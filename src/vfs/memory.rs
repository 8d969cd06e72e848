use std::collections::{BTreeMap, HashSet};
use std::io;
use std::io::Cursor;
use std::time::SystemTime;
use crate::vfs::{Vfs, VfsDirEntry, VfsMeta, VfsReader};
use crate::vfs::path::basename;

#[derive(Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory VFS, mostly useful as a test double.
///
/// Parent directories are created implicitly. Listings come back sorted by name.
#[derive(Clone)]
pub struct MemoryVfs {
    nodes: BTreeMap<String, Node>,
    failing_stat: HashSet<String>,
    failing_readdir: HashSet<String>,
    failing_read: HashSet<String>,
    modified: SystemTime,
}

impl Default for MemoryVfs {
    fn default() -> Self {
        MemoryVfs::new()
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

impl MemoryVfs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        MemoryVfs {
            nodes,
            failing_stat: HashSet::new(),
            failing_readdir: HashSet::new(),
            failing_read: HashSet::new(),
            modified: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000),
        }
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut current = parent_of(path);
        while let Some(dir) = current {
            self.nodes.entry(dir.to_string()).or_insert(Node::Dir);
            current = parent_of(dir);
        }
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.ensure_parents(path);
        self.nodes.insert(path.to_string(), Node::File(content.into()));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.ensure_parents(path);
        self.nodes.insert(path.to_string(), Node::Dir);
        self
    }

    /// Make `stat(path)` fail with `PermissionDenied`.
    pub fn fail_stat(mut self, path: &str) -> Self {
        self.failing_stat.insert(path.to_string());
        self
    }

    /// Make `readdir(path)` fail with `PermissionDenied`.
    pub fn fail_readdir(mut self, path: &str) -> Self {
        self.failing_readdir.insert(path.to_string());
        self
    }

    /// Make `read_file(path)` fail with `PermissionDenied`.
    pub fn fail_read(mut self, path: &str) -> Self {
        self.failing_read.insert(path.to_string());
        self
    }

    fn not_found(path: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path))
    }

    fn denied(path: &str) -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, format!("access to {} denied", path))
    }
}

#[async_trait::async_trait]
impl Vfs for MemoryVfs {
    async fn stat(&self, path: &str) -> io::Result<Option<VfsMeta>> {
        if self.failing_stat.contains(path) {
            return Err(Self::denied(path));
        }
        Ok(self.nodes.get(path).map(|node| match node {
            Node::File(content) => VfsMeta {
                is_dir: false,
                size: content.len() as u64,
                modified: Some(self.modified),
            },
            Node::Dir => VfsMeta {
                is_dir: true,
                size: 0,
                modified: Some(self.modified),
            },
        }))
    }

    async fn readdir(&self, path: &str) -> io::Result<Vec<VfsDirEntry>> {
        if self.failing_readdir.contains(path) {
            return Err(Self::denied(path));
        }
        match self.nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(io::ErrorKind::Other, format!("{} is not a directory", path)));
            }
            None => return Err(Self::not_found(path)),
        }
        Ok(self.nodes.iter()
            .filter(|(candidate, _)| parent_of(candidate) == Some(path))
            .filter_map(|(candidate, node)| {
                basename(candidate).map(|name| VfsDirEntry {
                    name: name.to_string(),
                    is_dir: matches!(node, Node::Dir),
                })
            })
            .collect())
    }

    async fn read_file(&self, path: &str) -> io::Result<VfsReader> {
        if self.failing_read.contains(path) {
            return Err(Self::denied(path));
        }
        match self.nodes.get(path) {
            Some(Node::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(Node::Dir) => Err(io::Error::new(io::ErrorKind::Other, format!("{} is a directory", path))),
            None => Err(Self::not_found(path)),
        }
    }
}
