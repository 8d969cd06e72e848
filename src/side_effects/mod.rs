pub mod download_log;

pub use download_log::TracingDownloadLog;

/// What is known about a download by the time it is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectProps {
    pub request_ip: String,
    pub user_agent: String,
    pub file_name: String,      // archive name sent to the client
    pub selection: Vec<String>, // VFS paths going into the archive
}

/// Fire-and-forget hook run once per accepted download.
#[async_trait::async_trait]
pub trait SideEffect: Send + Sync {
    async fn do_effect(&self, props: SideEffectProps);
}
