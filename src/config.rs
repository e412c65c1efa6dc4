use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TaggerError};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "hwp-tagger.toml";

/// Environment variable prefix (`HWP_TAGGER__TAGGER__BUFFER_CAPACITY=...`)
pub const ENV_PREFIX: &str = "HWP_TAGGER";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub output: OutputConfig,
    pub tagger: TaggerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// `host:port` of the device log stream
    pub address: Option<String>,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory and file prefix of the persistent log, e.g. `logs/POOL`
    pub log_prefix: PathBuf,
    /// Rotated daily files kept on disk
    pub retention_days: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Lines kept for retrospective tags
    pub buffer_capacity: usize,
    /// How long a quiet stream waits before pending tags are flushed
    pub idle_drain_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_prefix: PathBuf::from("POOL"),
            retention_days: 7,
        }
    }
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 5000,
            idle_drain_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl TaggerConfig {
    pub fn idle_drain(&self) -> Duration {
        Duration::from_millis(self.idle_drain_ms)
    }
}

/// Load configuration from `path` (optional file) and the environment
///
/// A missing file is fine, defaults apply. An explicitly given file that
/// does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = settings.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.tagger.buffer_capacity == 0 {
        return Err(TaggerError::Config(
            "tagger.buffer_capacity must be greater than zero".to_string(),
        ));
    }

    if cfg.tagger.idle_drain_ms == 0 {
        return Err(TaggerError::Config(
            "tagger.idle_drain_ms must be greater than zero".to_string(),
        ));
    }

    if cfg.output.retention_days == 0 {
        return Err(TaggerError::Config(
            "output.retention_days must be greater than zero".to_string(),
        ));
    }

    if cfg.output.log_prefix.as_os_str().is_empty() {
        return Err(TaggerError::Config(
            "output.log_prefix cannot be empty".to_string(),
        ));
    }

    if let Some(address) = &cfg.device.address {
        if !address.contains(':') {
            return Err(TaggerError::Config(format!(
                "device.address '{}' must be host:port",
                address
            )));
        }
    }

    Ok(())
}
