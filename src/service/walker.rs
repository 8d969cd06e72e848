use std::io;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use crate::error::{DownloadError, DownloadResult};
use crate::service::layout::{EntryKind, LayoutEntry};
use crate::vfs::path::{child, is_plain_name};
use crate::vfs::{Vfs, VfsDirEntry};

struct DirCursor {
    source_path: String,
    archive_path: String,
    children: std::vec::IntoIter<VfsDirEntry>,
}

/// Depth-first, pre-order walk below one layout root.
///
/// A directory is listed only when the walk reaches it, so memory holds one listing
/// per open level of the tree.
pub struct TreeWalker<'a> {
    vfs: &'a dyn Vfs,
    root: Option<LayoutEntry>,
    descend: Option<LayoutEntry>,
    stack: Vec<DirCursor>,
}

fn archive_child(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

impl<'a> TreeWalker<'a> {
    pub fn new(vfs: &'a dyn Vfs, root: LayoutEntry) -> Self {
        TreeWalker {
            vfs,
            root: Some(root),
            descend: None,
            stack: Vec::new(),
        }
    }

    async fn open_dir(&mut self, dir: LayoutEntry) -> DownloadResult<()> {
        let children = self.vfs.readdir(&dir.source_path).await
            .map_err(|e| DownloadError::vfs(&dir.source_path, e))?;
        if let Some(bad) = children.iter().find(|c| !is_plain_name(&c.name)) {
            return Err(DownloadError::vfs(
                &dir.source_path,
                io::Error::new(io::ErrorKind::InvalidData, format!("unusable entry name {:?}", bad.name)),
            ));
        }
        self.stack.push(DirCursor {
            source_path: dir.source_path,
            archive_path: dir.archive_path,
            children: children.into_iter(),
        });
        Ok(())
    }

    /// Next entry, or `None` once the tree is exhausted.
    pub async fn next_entry(&mut self) -> DownloadResult<Option<LayoutEntry>> {
        loop {
            if let Some(dir) = self.descend.take() {
                self.open_dir(dir).await?;
            }
            if let Some(root) = self.root.take() {
                if root.is_dir() {
                    self.descend = Some(root.clone());
                    if root.archive_path.is_empty() {
                        continue;
                    }
                }
                return Ok(Some(root));
            }
            let cursor = match self.stack.last_mut() {
                Some(cursor) => cursor,
                None => return Ok(None),
            };
            match cursor.children.next() {
                None => { self.stack.pop(); }
                Some(VfsDirEntry { name, is_dir }) => {
                    let entry = LayoutEntry {
                        source_path: child(&cursor.source_path, &name),
                        archive_path: archive_child(&cursor.archive_path, &name),
                        kind: if is_dir { EntryKind::Directory } else { EntryKind::File },
                    };
                    if is_dir {
                        self.descend = Some(entry.clone());
                    }
                    return Ok(Some(entry));
                }
            }
        }
    }

    pub fn into_stream(self) -> BoxStream<'a, DownloadResult<LayoutEntry>> {
        stream::try_unfold(self, |mut walker| async move {
            let next = walker.next_entry().await?;
            Ok::<_, DownloadError>(next.map(|entry| (entry, walker)))
        }).boxed()
    }
}

/// Walk every root in order, one after the other.
pub fn walk_all<'a>(vfs: &'a dyn Vfs, roots: Vec<LayoutEntry>) -> BoxStream<'a, DownloadResult<LayoutEntry>> {
    stream::iter(roots)
        .map(move |root| Ok::<_, DownloadError>(TreeWalker::new(vfs, root).into_stream()))
        .try_flatten()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;

    fn dir(source: &str, archive: &str) -> LayoutEntry {
        LayoutEntry { source_path: source.to_string(), archive_path: archive.to_string(), kind: EntryKind::Directory }
    }

    fn file(source: &str, archive: &str) -> LayoutEntry {
        LayoutEntry { source_path: source.to_string(), archive_path: archive.to_string(), kind: EntryKind::File }
    }

    async fn collect(vfs: &MemoryVfs, roots: Vec<LayoutEntry>) -> DownloadResult<Vec<LayoutEntry>> {
        walk_all(vfs, roots).try_collect().await
    }

    #[tokio::test]
    async fn test_file_root_yields_itself() {
        let vfs = MemoryVfs::new().with_file("/a/x.txt", "x");
        let entries = collect(&vfs, vec![file("/a/x.txt", "x.txt")]).await.unwrap();
        assert_eq!(entries, vec![file("/a/x.txt", "x.txt")]);
    }

    #[tokio::test]
    async fn test_directory_pre_order() {
        let vfs = MemoryVfs::new()
            .with_file("/d/sub/file.txt", "f")
            .with_file("/d/a.txt", "a")
            .with_dir("/d/sub/empty");
        let entries = collect(&vfs, vec![dir("/d", "d")]).await.unwrap();
        assert_eq!(entries, vec![
            dir("/d", "d"),
            file("/d/a.txt", "d/a.txt"),
            dir("/d/sub", "d/sub"),
            dir("/d/sub/empty", "d/sub/empty"),
            file("/d/sub/file.txt", "d/sub/file.txt"),
        ]);
    }

    #[tokio::test]
    async fn test_vfs_root_children_at_archive_root() {
        let vfs = MemoryVfs::new().with_file("/top.txt", "t").with_file("/d/x.txt", "x");
        let entries = collect(&vfs, vec![dir("/", "")]).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.archive_path.as_str()).collect();
        assert_eq!(names, vec!["d", "d/x.txt", "top.txt"]);
        assert_eq!(entries[1].source_path, "/d/x.txt");
    }

    #[tokio::test]
    async fn test_multiple_roots_do_not_mix() {
        let vfs = MemoryVfs::new().with_file("/a/one/x.txt", "x").with_file("/b/two/y.txt", "y");
        let entries = collect(&vfs, vec![dir("/a/one", "one"), dir("/b/two", "two")]).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.archive_path.as_str()).collect();
        assert_eq!(names, vec!["one", "one/x.txt", "two", "two/y.txt"]);
    }

    #[tokio::test]
    async fn test_readdir_failure_aborts() {
        let vfs = MemoryVfs::new()
            .with_file("/d/ok/x.txt", "x")
            .with_file("/d/locked/y.txt", "y")
            .fail_readdir("/d/locked");
        let mut walker = TreeWalker::new(&vfs, dir("/d", "d"));
        let mut seen = Vec::new();
        let err = loop {
            match walker.next_entry().await {
                Ok(Some(entry)) => seen.push(entry.archive_path),
                Ok(None) => panic!("walk should fail"),
                Err(e) => break e,
            }
        };
        assert_eq!(seen, vec!["d", "d/locked"]);
        assert!(matches!(err, DownloadError::Vfs { path, .. } if path == "/d/locked"));
    }
}
