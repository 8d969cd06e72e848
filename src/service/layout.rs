use tracing::debug;
use crate::error::{DownloadError, DownloadResult};
use crate::vfs::path::basename;
use crate::vfs::Vfs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One archive member: where it comes from and where it lands.
///
/// `archive_path` is relative, `/`-separated, never contains `..`. It is empty only
/// for a directory whose children belong at the archive root (the VFS root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub source_path: String,
    pub archive_path: String,
    pub kind: EntryKind,
}

impl LayoutEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Stat every selected path and anchor each one at its own basename.
///
/// Entries keep the order of `selection`. Two selections sharing a basename both
/// stay in the plan unchanged; nothing is renamed.
pub async fn plan(vfs: &dyn Vfs, selection: &[String]) -> DownloadResult<Vec<LayoutEntry>> {
    if selection.is_empty() {
        return Err(DownloadError::InvalidRequest("nothing selected".to_string()));
    }
    let mut roots = Vec::with_capacity(selection.len());
    for source_path in selection {
        let meta = vfs.stat(source_path).await
            .map_err(|e| DownloadError::vfs(source_path, e))?
            .ok_or_else(|| DownloadError::NotFound(source_path.clone()))?;
        let kind = if meta.is_dir { EntryKind::Directory } else { EntryKind::File };
        let archive_path = match basename(source_path) {
            Some(name) => name.to_string(),
            None if kind == EntryKind::Directory => String::new(),
            None => {
                return Err(DownloadError::InvalidRequest(format!("{} has no file name", source_path)));
            }
        };
        debug!(source = %source_path, archive = %archive_path, ?kind, "planned root");
        roots.push(LayoutEntry {
            source_path: source_path.clone(),
            archive_path,
            kind,
        });
    }
    Ok(roots)
}
