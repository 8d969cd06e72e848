use std::io;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type DownloadResult<T> = Result<T, DownloadError>;

/// Every failure the download pipeline can surface.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Malformed, empty or escaping selection
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A selected path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// stat/readdir/read failure reported by the VFS
    #[error("vfs error on {path}: {source}")]
    Vfs {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Archive format invariant violated
    #[error("archive encoding error: {0}")]
    Encoding(String),

    /// The response pipe went away (client disconnect) or failed
    #[error("output stream failed: {0}")]
    Output(#[source] io::Error),
}

impl DownloadError {
    pub fn vfs(path: impl Into<String>, source: io::Error) -> Self {
        DownloadError::Vfs {
            path: path.into(),
            source,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        match self {
            DownloadError::Output(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::WriteZero
            ),
            _ => false,
        }
    }
}

impl ResponseError for DownloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            DownloadError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DownloadError::NotFound(_) => StatusCode::NOT_FOUND,
            DownloadError::Vfs { .. } | DownloadError::Encoding(_) | DownloadError::Output(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
