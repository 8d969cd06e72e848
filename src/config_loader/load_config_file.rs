use std::error::Error;
use std::fs::File;
use std::path::Path;
use crate::config_loader::{Config, CONFIG_PATH, CONFIG_PATH_ENV};
use crate::config_loader::config_struct::ConfigFile;

pub fn load_config() -> Result<Config, Box<dyn Error>> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| CONFIG_PATH.to_owned());
    load_config_from(path)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, Box<dyn Error>> {
    let config_file = File::open(path)?;
    let config_file: ConfigFile = serde_json::from_reader(config_file)?;
    Ok(resolve(config_file))
}

// fill in default values for everything optional
pub fn resolve(config_file: ConfigFile) -> Config {
    let mount = config_file.mount
        .map(|mount| mount.trim_end_matches('/').to_owned())
        .unwrap_or_default();
    Config {
        server: config_file.server.unwrap_or_default(),
        vfs_root: config_file.vfs.root,
        base_dir: config_file.base_dir.unwrap_or_else(|| "/".to_owned()),
        mount,
        download: config_file.download.unwrap_or_default(),
    }
}
