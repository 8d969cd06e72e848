use actix_web::http::header;
use actix_web::web::Query;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use futures::future;
use tokio_util::io::ReaderStream;
use tracing::{info_span, Instrument};
use uuid::Uuid;
use crate::error::{DownloadError, DownloadResult};
use crate::request_handler::State;
use crate::service::{ArchiveBody, DownloadService, PreparedDownload};
use crate::side_effects::SideEffectProps;

#[derive(Debug, Default, serde::Deserialize)]
pub struct DownloadQuery {
    pub download: Option<String>,
    pub format: Option<String>,
}

/// # Download API
/// `GET <mount>/<path>[,<path>...]?download[=<filename>]` streams the selection as a
/// tar.gz or zip archive. Without `download` the request is rejected.
pub async fn download_handler(
    state: web::Data<State>,
    query: Query<DownloadQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DownloadError> {
    let span = info_span!("download", id = %Uuid::new_v4());
    async move {
        let full_path = req.uri().path();
        let raw_path = full_path.strip_prefix(state.mount.as_str()).unwrap_or(full_path);
        let request = state.service.interpret(raw_path, query.download.as_deref(), query.format.as_deref())?;

        let ip = req.connection_info().realip_remote_addr().unwrap_or("").to_string();
        let ua = match req.headers().get(header::USER_AGENT) {
            None => "",
            Some(ua) => ua.to_str().unwrap_or("")
        };
        state.log.do_effect(SideEffectProps {
            request_ip: ip,
            user_agent: ua.to_string(),
            file_name: request.filename.clone(),
            selection: request.selection.clone(),
        }).await;

        let prepared = state.service.prepare(request).await?;
        stream_archive(&state.service, prepared).await
    }.instrument(span).await
}

/// Start encoding and build the streaming response.
///
/// Headers are only committed once the encoder has produced its first bytes, so a
/// failure before that point still becomes a plain error response. After that a
/// failure ends the body with an error and the connection is dropped.
pub async fn stream_archive(service: &DownloadService, prepared: PreparedDownload) -> DownloadResult<HttpResponse> {
    let PreparedDownload { request, roots } = prepared;
    let ArchiveBody { reader, task } = service.start(request.format, roots);
    let mut body = ReaderStream::with_capacity(reader, service.setting().chunk_size.max(1));

    let (first, task) = match body.next().await {
        Some(Ok(bytes)) => (bytes, Some(task)),
        Some(Err(e)) => return Err(DownloadError::Output(e)),
        None => {
            join_encoder(task).await?;
            (Bytes::new(), None)
        }
    };

    let outcome = stream::iter(task)
        .then(join_encoder)
        .filter_map(|result| future::ready(result.err().map(Err::<Bytes, DownloadError>)));
    let archive = stream::once(future::ready(Ok::<Bytes, DownloadError>(first)))
        .chain(body.map(|chunk| chunk.map_err(DownloadError::Output)))
        .chain(outcome);

    Ok(HttpResponse::Ok()
        .content_type(request.format.content_type())
        .insert_header((header::CONTENT_DISPOSITION, request.content_disposition()))
        .streaming(archive))
}

async fn join_encoder(task: tokio::task::JoinHandle<DownloadResult<()>>) -> DownloadResult<()> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(DownloadError::Encoding(format!("encoder task failed: {}", e))),
    }
}
