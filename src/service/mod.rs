pub mod layout;
pub mod request;
pub mod walker;

use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument, Span};
use crate::archive::{encode_archive, ArchiveFormat};
use crate::config_loader::config_struct::DownloadSetting;
use crate::error::{DownloadError, DownloadResult};
use crate::vfs::Vfs;

pub use layout::{EntryKind, LayoutEntry};
pub use request::ArchiveRequest;

/// A request that passed interpretation and planning; nothing has been written yet.
#[derive(Debug)]
pub struct PreparedDownload {
    pub request: ArchiveRequest,
    pub roots: Vec<LayoutEntry>,
}

/// The running encoder: archive bytes come out of `reader`, the outcome out of `task`.
pub struct ArchiveBody {
    pub reader: DuplexStream,
    pub task: JoinHandle<DownloadResult<()>>,
}

/// Turns selections under `base_dir` of a VFS into streamed archives.
pub struct DownloadService {
    vfs: Arc<dyn Vfs>,
    base_dir: String,
    setting: DownloadSetting,
}

impl DownloadService {
    pub fn new(vfs: Arc<dyn Vfs>, base_dir: impl Into<String>, setting: DownloadSetting) -> Self {
        DownloadService {
            vfs,
            base_dir: base_dir.into(),
            setting,
        }
    }

    pub fn setting(&self) -> &DownloadSetting {
        &self.setting
    }

    pub fn interpret(
        &self,
        raw_path: &str,
        download: Option<&str>,
        format_hint: Option<&str>,
    ) -> DownloadResult<ArchiveRequest> {
        ArchiveRequest::interpret(raw_path, download, format_hint, &self.base_dir, &self.setting.default_name)?
            .ok_or_else(|| DownloadError::InvalidRequest("missing `download` query parameter".to_string()))
    }

    pub async fn prepare(&self, request: ArchiveRequest) -> DownloadResult<PreparedDownload> {
        let roots = layout::plan(self.vfs.as_ref(), &request.selection).await?;
        debug!(roots = roots.len(), format = ?request.format, filename = %request.filename, "download planned");
        Ok(PreparedDownload { request, roots })
    }

    /// Spawn the encoder. It stops as soon as `reader` is dropped.
    pub fn start(&self, format: ArchiveFormat, roots: Vec<LayoutEntry>) -> ArchiveBody {
        let (writer, reader) = tokio::io::duplex(self.setting.pipe_capacity.max(1));
        let vfs = self.vfs.clone();
        let chunk_size = self.setting.chunk_size;
        let task = tokio::spawn(async move {
            let result = encode_archive(format, vfs.as_ref(), roots, writer, chunk_size).await;
            match &result {
                Ok(()) => info!("archive complete"),
                Err(e) if e.is_disconnect() => debug!("client went away: {}", e),
                Err(e) => error!("archive aborted: {}", e),
            }
            result
        }.instrument(Span::current()));
        ArchiveBody { reader, task }
    }
}
