//! Zip encoder on top of `async_zip`.
//!
//! Files are deflated through `write_entry_stream`, which announces CRC-32 and sizes in
//! a data descriptor after the payload, so the output is written in a single pass and
//! never has to seek. Directories are stored as empty entries ending in `/`.

use async_zip::error::ZipError;
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipDateTime, ZipDateTimeBuilder, ZipEntryBuilder};
use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::AsyncWriteExt as _;
use tokio::io::AsyncWrite;
use crate::archive::{ArchiveWriter, EntryReader};
use crate::error::{DownloadError, DownloadResult};
use crate::vfs::VfsMeta;

const FILE_MODE: u16 = 0o100644;
const DIR_MODE: u16 = 0o040755;

fn zip_error(e: ZipError) -> DownloadError {
    match e {
        ZipError::UpstreamReadError(e) => DownloadError::Output(e),
        e => DownloadError::Encoding(format!("zip encoder failed: {}", e)),
    }
}

fn finished() -> DownloadError {
    DownloadError::Encoding("zip already finished".to_string())
}

/// DOS timestamps only cover 1980..=2107; anything outside is left unset.
fn zip_datetime(meta: &VfsMeta) -> Option<ZipDateTime> {
    let dt: DateTime<Utc> = meta.modified?.into();
    if !(1980..=2107).contains(&dt.year()) {
        return None;
    }
    Some(ZipDateTimeBuilder::new()
        .year(dt.year())
        .month(dt.month())
        .day(dt.day())
        .hour(dt.hour())
        .minute(dt.minute())
        .second(dt.second())
        .build())
}

fn entry_builder(name: String, compression: Compression, mode: u16, meta: &VfsMeta) -> ZipEntryBuilder {
    let builder = ZipEntryBuilder::new(name.into(), compression).unix_permissions(mode);
    match zip_datetime(meta) {
        Some(date) => builder.last_modification_date(date),
        None => builder,
    }
}

pub struct ZipWriter<W> {
    writer: Option<ZipFileWriter<W>>,
}

impl<W: AsyncWrite + Unpin + Send> ZipWriter<W> {
    pub fn new(out: W) -> Self {
        ZipWriter {
            writer: Some(ZipFileWriter::with_tokio(out)),
        }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> ArchiveWriter for ZipWriter<W> {
    async fn add_directory(&mut self, archive_path: &str, meta: &VfsMeta) -> DownloadResult<()> {
        let writer = self.writer.as_mut().ok_or_else(finished)?;
        let name = format!("{}/", archive_path.trim_end_matches('/'));
        let entry = entry_builder(name, Compression::Stored, DIR_MODE, meta);
        writer.write_entry_whole(entry, &[]).await.map_err(zip_error)
    }

    async fn add_file(&mut self, archive_path: &str, meta: &VfsMeta, data: &mut EntryReader<'_>) -> DownloadResult<()> {
        let writer = self.writer.as_mut().ok_or_else(finished)?;
        let entry = entry_builder(archive_path.to_string(), Compression::Deflate, FILE_MODE, meta);
        let mut entry = writer.write_entry_stream(entry).await.map_err(zip_error)?;
        loop {
            let chunk = data.next_chunk().await?;
            if chunk.is_empty() {
                break;
            }
            entry.write_all(chunk).await.map_err(DownloadError::Output)?;
        }
        entry.close().await.map_err(zip_error)
    }

    async fn finish(&mut self) -> DownloadResult<()> {
        let writer = self.writer.take().ok_or_else(finished)?;
        let mut out = writer.close().await.map_err(zip_error)?.into_inner();
        tokio::io::AsyncWriteExt::shutdown(&mut out).await.map_err(DownloadError::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::time::{Duration, UNIX_EPOCH};
    use crate::archive::{encode_archive, ArchiveFormat};
    use crate::service::layout::plan;
    use crate::vfs::MemoryVfs;

    async fn encode(vfs: &MemoryVfs, selection: &[&str]) -> Vec<u8> {
        let selection: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
        let roots = plan(vfs, &selection).await.unwrap();
        let mut out = Vec::new();
        encode_archive(ArchiveFormat::Zip, vfs, roots, &mut out, 1024).await.unwrap();
        out
    }

    fn read_entry(archive: &mut ::zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut file = archive.by_name(name).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        content
    }

    #[tokio::test]
    async fn test_directory_tree() {
        let vfs = MemoryVfs::new()
            .with_file("/base/test/dir1/testdata1.txt", "testdata1\n")
            .with_file("/base/test/empty.txt", "")
            .with_dir("/base/test/dir2/deeper");
        let bytes = encode(&vfs, &["/base/test"]).await;
        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec![
            "test/",
            "test/dir1/",
            "test/dir1/testdata1.txt",
            "test/dir2/",
            "test/dir2/deeper/",
            "test/empty.txt",
        ]);
        assert!(archive.by_name("test/dir2/deeper/").unwrap().is_dir());
        assert_eq!(read_entry(&mut archive, "test/dir1/testdata1.txt"), b"testdata1\n");
        assert!(read_entry(&mut archive, "test/empty.txt").is_empty());
    }

    #[tokio::test]
    async fn test_compressed_content_across_chunks() {
        let content: Vec<u8> = b"0123456789abcdef".iter().cycle().take(50_000).copied().collect();
        let vfs = MemoryVfs::new().with_file("/data/big.txt", content.clone());
        let bytes = encode(&vfs, &["/data/big.txt"]).await;
        assert!(bytes.len() < content.len());
        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(read_entry(&mut archive, "big.txt"), content);
    }

    #[tokio::test]
    async fn test_entries_carry_mode_and_mtime() {
        let vfs = MemoryVfs::new().with_file("/d/a.txt", "abc");
        let bytes = encode(&vfs, &["/d"]).await;
        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let file = archive.by_name("d/a.txt").unwrap();
        assert_eq!(file.unix_mode().map(|mode| mode & 0o777), Some(0o644));
        let modified = file.last_modified();
        // 1_700_000_000 is 2023-11-14 22:13:20 UTC
        assert_eq!(
            (modified.year(), modified.month(), modified.day()),
            (2023, 11, 14)
        );
        assert_eq!(
            (modified.hour(), modified.minute(), modified.second()),
            (22, 13, 20)
        );
    }

    #[test]
    fn test_zip_datetime_range() {
        let meta = VfsMeta { is_dir: false, size: 0, modified: Some(UNIX_EPOCH) };
        assert!(zip_datetime(&meta).is_none());
        let meta = VfsMeta { modified: None, ..meta };
        assert!(zip_datetime(&meta).is_none());
        let meta = VfsMeta { modified: Some(UNIX_EPOCH + Duration::from_secs(1_709_618_828)), ..meta };
        assert!(zip_datetime(&meta).is_some());
    }

    #[tokio::test]
    async fn test_writer_refuses_entries_after_finish() {
        let mut out = Vec::new();
        let mut writer = ZipWriter::new(&mut out);
        writer.finish().await.unwrap();
        let meta = VfsMeta { is_dir: true, size: 0, modified: None };
        assert!(writer.add_directory("late", &meta).await.is_err());
    }
}
