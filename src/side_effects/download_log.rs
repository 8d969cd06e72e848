use tracing::info;
use crate::side_effects::{SideEffect, SideEffectProps};

/// Writes one structured `download_log` event per download.
pub struct TracingDownloadLog;

#[async_trait::async_trait]
impl SideEffect for TracingDownloadLog {
    async fn do_effect(&self, props: SideEffectProps) {
        let SideEffectProps { request_ip, user_agent, file_name, selection } = props;
        info!(
            target: "download_log",
            user_ip = %request_ip,
            user_agent = %user_agent,
            file_name = %file_name,
            selection = ?selection,
            "download started"
        );
    }
}
