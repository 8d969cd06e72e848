//! Serve VFS selections as streamed tar.gz or zip downloads.
//!
//! The host wires a [`vfs::Vfs`] and a base directory into a [`service::DownloadService`]
//! and mounts [`request_handler::configure`] on its actix-web app.

pub mod archive;
pub mod config_loader;
pub mod error;
pub mod request_handler;
pub mod service;
pub mod side_effects;
pub mod vfs;

pub use error::{DownloadError, DownloadResult};
pub use service::DownloadService;
