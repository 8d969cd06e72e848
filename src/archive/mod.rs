//! Streaming archive encoders.
//!
//! Both formats are written directly to an [`AsyncWrite`] while the tree walk is in
//! progress. Nothing larger than one read chunk (plus the zip central directory records)
//! is held in memory.

pub mod tar_gz;
pub mod zip;

use std::io;
use futures::TryStreamExt;
use tokio::io::{AsyncReadExt, AsyncWrite, Take};
use tracing::trace;
use crate::error::{DownloadError, DownloadResult};
use crate::service::layout::{EntryKind, LayoutEntry};
use crate::service::walker::walk_all;
use crate::vfs::{Vfs, VfsMeta, VfsReader};

pub use self::tar_gz::TarGzWriter;
pub use self::zip::ZipWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// `.zip` selects zip, anything else falls back to tar.gz.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_ascii_lowercase().ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    /// Value of the `format` query parameter.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "targz" => Some(ArchiveFormat::TarGz),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::Zip => ".zip",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "application/x-gzip",
            ArchiveFormat::Zip => "application/zip",
        }
    }
}

/// Content of one file entry, handed out chunk by chunk.
///
/// Yields exactly the size the entry was announced with. A file that ends early is a
/// VFS error on `source_path`, and anything past the announced size is left unread.
pub struct EntryReader<'a> {
    source_path: &'a str,
    inner: Take<VfsReader>,
    remaining: u64,
    buf: &'a mut [u8],
}

impl<'a> EntryReader<'a> {
    pub fn new(source_path: &'a str, reader: VfsReader, size: u64, buf: &'a mut [u8]) -> Self {
        EntryReader {
            source_path,
            inner: reader.take(size),
            remaining: size,
            buf,
        }
    }

    /// Next chunk of content, empty once the announced size has been read.
    pub async fn next_chunk(&mut self) -> DownloadResult<&[u8]> {
        if self.remaining == 0 {
            return Ok(&[]);
        }
        let n = self.inner.read(&mut *self.buf).await
            .map_err(|e| DownloadError::vfs(self.source_path, e))?;
        if n == 0 {
            return Err(DownloadError::vfs(self.source_path, io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended {} bytes short of its reported size", self.remaining),
            )));
        }
        self.remaining -= n as u64;
        Ok(&self.buf[..n])
    }
}

/// Format-specific half of an encoder. The entry loop in [`write_entries`] drives it.
#[async_trait::async_trait]
pub trait ArchiveWriter: Send {
    async fn add_directory(&mut self, archive_path: &str, meta: &VfsMeta) -> DownloadResult<()>;

    /// Add a file of `meta.size` bytes, streamed from `data` until it runs dry.
    async fn add_file(&mut self, archive_path: &str, meta: &VfsMeta, data: &mut EntryReader<'_>) -> DownloadResult<()>;

    /// Write trailers and shut the output down. The writer must not be used afterwards.
    async fn finish(&mut self) -> DownloadResult<()>;
}

/// Encode every entry reachable from `roots` as `format` into `out`.
pub async fn encode_archive<W>(
    format: ArchiveFormat,
    vfs: &dyn Vfs,
    roots: Vec<LayoutEntry>,
    out: W,
    chunk_size: usize,
) -> DownloadResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    match format {
        ArchiveFormat::TarGz => write_entries(TarGzWriter::new(out), vfs, roots, chunk_size).await,
        ArchiveFormat::Zip => write_entries(ZipWriter::new(out), vfs, roots, chunk_size).await,
    }
}

async fn write_entries<A: ArchiveWriter>(
    mut archive: A,
    vfs: &dyn Vfs,
    roots: Vec<LayoutEntry>,
    chunk_size: usize,
) -> DownloadResult<()> {
    let mut entries = walk_all(vfs, roots);
    let mut buf = vec![0u8; chunk_size.max(512)];
    while let Some(entry) = entries.try_next().await? {
        let meta = vfs.stat(&entry.source_path).await
            .map_err(|e| DownloadError::vfs(&entry.source_path, e))?
            .ok_or_else(|| DownloadError::vfs(
                &entry.source_path,
                io::Error::new(io::ErrorKind::NotFound, "vanished while archiving"),
            ))?;
        trace!(archive_path = %entry.archive_path, size = meta.size, "writing entry");
        match entry.kind {
            EntryKind::Directory => archive.add_directory(&entry.archive_path, &meta).await?,
            EntryKind::File => {
                let reader = vfs.read_file(&entry.source_path).await
                    .map_err(|e| DownloadError::vfs(&entry.source_path, e))?;
                let mut data = EntryReader::new(&entry.source_path, reader, meta.size, &mut buf);
                archive.add_file(&entry.archive_path, &meta, &mut data).await?;
            }
        }
    }
    archive.finish().await
}
