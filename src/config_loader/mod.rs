pub mod config_struct;
mod load_config_file;

use std::path::PathBuf;
use crate::config_loader::config_struct::{DownloadSetting, ServerSetting};

pub use load_config_file::{load_config, load_config_from, resolve};

pub const CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "VFS_DOWNLOAD_CONFIG";

pub struct Config {
    pub server: ServerSetting,
    pub vfs_root: PathBuf,
    pub base_dir: String,
    pub mount: String,
    pub download: DownloadSetting,
}
