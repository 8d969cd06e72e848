use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use crate::archive::ArchiveFormat;
use crate::error::{DownloadError, DownloadResult};
use crate::vfs::path::{basename, join_checked};

/// RFC 5987 `attr-char`: everything except ALPHA / DIGIT / "!#$&+-.^_`|~" is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// What the client asked to have archived, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Absolute VFS paths, in request order.
    pub selection: Vec<String>,
    pub format: ArchiveFormat,
    pub filename: String,
}

impl ArchiveRequest {
    /// Interpret the raw (still percent-encoded) path tail and query parameters.
    ///
    /// Returns `Ok(None)` when `download` is absent: that request is not an archive download.
    pub fn interpret(
        raw_path: &str,
        download: Option<&str>,
        format_hint: Option<&str>,
        base_dir: &str,
        default_name: &str,
    ) -> DownloadResult<Option<ArchiveRequest>> {
        let download = match download {
            None => return Ok(None),
            Some(download) => download,
        };
        let selection = parse_selection(raw_path, base_dir)?;

        let (format, filename) = if download.trim().is_empty() {
            let format = match format_hint {
                None => ArchiveFormat::TarGz,
                Some(hint) => ArchiveFormat::from_hint(hint).ok_or_else(|| {
                    DownloadError::InvalidRequest(format!("unsupported archive format {:?}", hint))
                })?,
            };
            let stem = match selection.as_slice() {
                [single] => basename(single).unwrap_or(default_name),
                _ => default_name,
            };
            (format, format!("{}{}", stem, format.extension()))
        } else {
            (ArchiveFormat::from_filename(download), download.to_string())
        };

        Ok(Some(ArchiveRequest {
            selection,
            format,
            filename,
        }))
    }

    pub fn content_disposition(&self) -> String {
        content_disposition(&self.filename)
    }
}

/// Split the path tail on commas, decode each piece and anchor it under `base_dir`.
///
/// An empty tail selects `base_dir` itself.
pub fn parse_selection(raw_path: &str, base_dir: &str) -> DownloadResult<Vec<String>> {
    let pieces: Vec<&str> = if raw_path.trim_matches('/').is_empty() {
        vec![""]
    } else {
        raw_path.split(',').filter(|piece| !piece.trim_matches('/').is_empty()).collect()
    };
    if pieces.is_empty() {
        return Err(DownloadError::InvalidRequest("empty selection".to_string()));
    }
    pieces.into_iter()
        .map(|piece| {
            let decoded = percent_decode_str(piece)
                .decode_utf8()
                .map_err(|_| DownloadError::InvalidRequest(format!("{:?} is not valid utf-8", piece)))?;
            join_checked(base_dir, &decoded)
                .ok_or_else(|| DownloadError::InvalidRequest(format!("{:?} escapes the base directory", decoded)))
        })
        .collect()
}

pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename*=utf-8''{}", utf8_percent_encode(filename, ATTR_CHAR))
}
