//! tar.gz encoder on top of `tar::Builder`.
//!
//! The builder writes into a gzip encoder over an in-memory buffer that is handed to
//! the async output after every step, so only one chunk of compressed data is ever
//! buffered. File content is streamed straight into the encoder behind a header-only
//! `append_data`, which keeps GNU long names and large sizes in the builder's hands.

use std::io::{self, Write};
use std::time::UNIX_EPOCH;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use crate::archive::{ArchiveWriter, EntryReader};
use crate::error::{DownloadError, DownloadResult};
use crate::vfs::VfsMeta;

const BLOCK_LEN: u64 = 512;
const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

type GzBuilder = Builder<GzEncoder<Vec<u8>>>;

fn padding(size: u64) -> usize {
    ((BLOCK_LEN - size % BLOCK_LEN) % BLOCK_LEN) as usize
}

fn mtime_of(meta: &VfsMeta) -> u64 {
    meta.modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn header_for(meta: &VfsMeta, entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header.set_mtime(mtime_of(meta));
    header
}

fn compressor_error(e: io::Error) -> DownloadError {
    DownloadError::Encoding(format!("tar.gz encoder failed: {}", e))
}

fn finished() -> DownloadError {
    DownloadError::Encoding("tar.gz stream already finished".to_string())
}

/// Move whatever the gzip encoder produced so far into the async output.
async fn drain<W: AsyncWrite + Unpin + Send>(builder: &mut GzBuilder, out: &mut W) -> DownloadResult<()> {
    let pending = builder.get_mut().get_mut();
    if !pending.is_empty() {
        out.write_all(pending).await.map_err(DownloadError::Output)?;
        pending.clear();
    }
    Ok(())
}

pub struct TarGzWriter<W> {
    builder: Option<GzBuilder>,
    out: W,
}

impl<W: AsyncWrite + Unpin + Send> TarGzWriter<W> {
    pub fn new(out: W) -> Self {
        TarGzWriter {
            builder: Some(Builder::new(GzEncoder::new(Vec::new(), Compression::default()))),
            out,
        }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> ArchiveWriter for TarGzWriter<W> {
    async fn add_directory(&mut self, archive_path: &str, meta: &VfsMeta) -> DownloadResult<()> {
        let builder = self.builder.as_mut().ok_or_else(finished)?;
        let mut header = header_for(meta, EntryType::Directory, DIR_MODE, 0);
        builder.append_data(&mut header, archive_path, io::empty()).map_err(compressor_error)?;
        drain(builder, &mut self.out).await
    }

    async fn add_file(&mut self, archive_path: &str, meta: &VfsMeta, data: &mut EntryReader<'_>) -> DownloadResult<()> {
        let builder = self.builder.as_mut().ok_or_else(finished)?;
        let mut header = header_for(meta, EntryType::Regular, FILE_MODE, meta.size);
        // header only; the content and its padding follow below
        builder.append_data(&mut header, archive_path, io::empty()).map_err(compressor_error)?;
        drain(builder, &mut self.out).await?;
        loop {
            let chunk = data.next_chunk().await?;
            if chunk.is_empty() {
                break;
            }
            builder.get_mut().write_all(chunk).map_err(compressor_error)?;
            drain(builder, &mut self.out).await?;
        }
        let zeros = [0u8; BLOCK_LEN as usize];
        builder.get_mut().write_all(&zeros[..padding(meta.size)]).map_err(compressor_error)?;
        drain(builder, &mut self.out).await
    }

    async fn finish(&mut self) -> DownloadResult<()> {
        let builder = self.builder.take().ok_or_else(finished)?;
        let encoder = builder.into_inner().map_err(compressor_error)?;
        let rest = encoder.finish().map_err(compressor_error)?;
        self.out.write_all(&rest).await.map_err(DownloadError::Output)?;
        self.out.flush().await.map_err(DownloadError::Output)?;
        self.out.shutdown().await.map_err(DownloadError::Output)
    }
}
