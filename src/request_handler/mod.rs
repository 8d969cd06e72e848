pub mod download;

use std::sync::Arc;
use actix_web::web;
use crate::service::DownloadService;
use crate::side_effects::SideEffect;

pub use download::{download_handler, stream_archive, DownloadQuery};

/// Shared per-app state handed to every handler.
pub struct State {
    pub service: Arc<DownloadService>,
    pub log: Arc<dyn SideEffect>,
    pub mount: String,
}

/// Register `GET <mount>/<selection>` on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig, mount: &str) {
    cfg.route(&format!("{}/{{selection:.*}}", mount), web::get().to(download_handler));
}
