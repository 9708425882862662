use std::path::{Path, PathBuf};

use hexed_buffer::{LoadOptions, DEFAULT_LARGE_FILE_THRESHOLD};
use serde::Deserialize;

pub const CONFIG: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub buffer: BufferOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferOptions {
    /// Files at least this many bytes are memory mapped instead of read to
    /// memory. Mapped files cannot be inserted to or deleted from.
    pub large_file_threshold: u64,
}

impl Default for BufferOptions {
    fn default() -> Self {
        BufferOptions {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl BufferOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            large_file_threshold: self.large_file_threshold,
        }
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("hexed");
    path.push(CONFIG);
    Some(path)
}

/// Read configuration from `config_path`. A missing file results in the
/// default configuration.
pub fn read_config(config_path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .build()?;

    let config = config.try_deserialize::<Config>()?;

    Ok(config)
}
