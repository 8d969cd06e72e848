use std::path::PathBuf;
use serde::Deserialize;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_ARCHIVE_NAME: &str = "download";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_PIPE_CAPACITY: usize = 256 * 1024;

#[derive(Debug, Deserialize)]
pub struct ServerSetting {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub workers: Option<usize>,
}

impl Default for ServerSetting {
    fn default() -> Self {
        ServerSetting {
            bind: default_bind(),
            workers: None,
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_owned()
}

#[derive(Debug, Deserialize)]
pub struct VfsConfig {
    pub root: PathBuf,      // local directory that backs the VFS
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSetting {
    #[serde(default = "default_name")]
    pub default_name: String,   // used when no single basename can name the archive
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,      // bytes read from the VFS per step
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,   // bytes buffered between encoder and response
}

impl Default for DownloadSetting {
    fn default() -> Self {
        DownloadSetting {
            default_name: default_name(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

fn default_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_owned()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub server: Option<ServerSetting>,          // when not provided, listen on 127.0.0.1:8080
    pub vfs: VfsConfig,
    pub base_dir: Option<String>,               // VFS directory requests are resolved against, default "/"
    pub mount: Option<String>,                  // URL prefix of the download route, default ""
    pub download: Option<DownloadSetting>,      // when not provided, defaults are used
}
