use std::io;
use std::path::{Path, PathBuf};
use futures::TryStreamExt;
use tokio::fs;
use tokio_stream::wrappers::ReadDirStream;
use crate::vfs::{Vfs, VfsDirEntry, VfsMeta, VfsReader};
use crate::vfs::path::is_plain_name;

/// A VFS backed by a directory on local disk.
pub struct LocalVfs {
    root: PathBuf,
}

impl LocalVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalVfs {
            root: root.into()
        }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !is_plain_name(segment) {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("bad path segment {:?}", segment)));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

fn meta_of(meta: &std::fs::Metadata) -> VfsMeta {
    VfsMeta {
        is_dir: meta.is_dir(),
        size: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok(),
    }
}

// A link that cannot be followed is listed as a file; the later stat reports it by name.
async fn is_dir_following_links(path: &Path) -> bool {
    fs::metadata(path).await.map(|meta| meta.is_dir()).unwrap_or(false)
}

#[async_trait::async_trait]
impl Vfs for LocalVfs {
    async fn stat(&self, path: &str) -> io::Result<Option<VfsMeta>> {
        match fs::metadata(self.resolve(path)?).await {
            Ok(meta) => Ok(Some(meta_of(&meta))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn readdir(&self, path: &str) -> io::Result<Vec<VfsDirEntry>> {
        let dir = fs::read_dir(self.resolve(path)?).await?;
        let raw: Vec<fs::DirEntry> = ReadDirStream::new(dir).try_collect().await?;
        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, format!("non utf-8 file name {:?}", name)));
                }
            };
            let file_type = entry.file_type().await?;
            let is_dir = if file_type.is_symlink() {
                is_dir_following_links(&entry.path()).await
            } else {
                file_type.is_dir()
            };
            entries.push(VfsDirEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> io::Result<VfsReader> {
        let file = fs::File::open(self.resolve(path)?).await?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("test/dir1")).unwrap();
        std::fs::create_dir_all(dir.path().join("test/empty")).unwrap();
        std::fs::write(dir.path().join("test/dir1/testdata1.txt"), "hello\n").unwrap();
        std::fs::write(dir.path().join("test/b.txt"), "").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_stat() {
        let dir = fixture();
        let vfs = LocalVfs::new(dir.path());
        let meta = vfs.stat("/test/dir1/testdata1.txt").await.unwrap().unwrap();
        assert!(!meta.is_dir);
        assert_eq!(meta.size, 6);
        assert!(vfs.stat("/test").await.unwrap().unwrap().is_dir);
        assert!(vfs.stat("/").await.unwrap().unwrap().is_dir);
        assert_eq!(vfs.stat("/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_readdir_sorted() {
        let dir = fixture();
        let vfs = LocalVfs::new(dir.path());
        let entries = vfs.readdir("/test").await.unwrap();
        assert_eq!(entries, vec![
            VfsDirEntry { name: "b.txt".to_string(), is_dir: false },
            VfsDirEntry { name: "dir1".to_string(), is_dir: true },
            VfsDirEntry { name: "empty".to_string(), is_dir: true },
        ]);
        assert!(vfs.readdir("/missing").await.is_err());
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = fixture();
        let vfs = LocalVfs::new(dir.path());
        let mut reader = vfs.read_file("/test/dir1/testdata1.txt").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello\n");
    }

    #[tokio::test]
    async fn test_rejects_parent_segments() {
        let dir = fixture();
        let vfs = LocalVfs::new(dir.path().join("test"));
        assert!(vfs.stat("/../test").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_is_reported_by_its_own_path() {
        let dir = fixture();
        std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("test/broken")).unwrap();
        let vfs = LocalVfs::new(dir.path());

        let entries = vfs.readdir("/test").await.unwrap();
        assert!(entries.contains(&VfsDirEntry { name: "broken".to_string(), is_dir: false }));
        assert_eq!(vfs.stat("/test/broken").await.unwrap(), None);

        let roots = crate::service::layout::plan(&vfs, &["/test".to_string()]).await.unwrap();
        let mut out = Vec::new();
        let err = crate::archive::encode_archive(crate::archive::ArchiveFormat::TarGz, &vfs, roots, &mut out, 4096)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DownloadError::Vfs { path, .. } if path == "/test/broken"));
    }
}
