use std::sync::Arc;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vfs_download::config_loader::{load_config, Config};
use vfs_download::request_handler::{configure, State};
use vfs_download::side_effects::TracingDownloadLog;
use vfs_download::vfs::LocalVfs;
use vfs_download::DownloadService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Config { server, vfs_root, base_dir, mount, download } = match load_config() {
        Ok(config) => config,
        Err(e) => {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("failed to load config: {}", e)));
        }
    };
    info!(root = %vfs_root.display(), %base_dir, %mount, bind = %server.bind, "starting download server");

    let vfs = Arc::new(LocalVfs::new(vfs_root));
    let state = web::Data::new(State {
        service: Arc::new(DownloadService::new(vfs, base_dir, download)),
        log: Arc::new(TracingDownloadLog),
        mount: mount.clone(),
    });

    let mut http = HttpServer::new(move || {
        let mount = mount.clone();
        App::new()
            .app_data(state.clone())
            .configure(move |cfg| configure(cfg, &mount))
    });
    if let Some(workers) = server.workers {
        http = http.workers(workers);
    }
    http.bind(server.bind.as_str())?.run().await
}
