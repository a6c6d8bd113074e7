//! Application settings loaded from `config.toml`.
//!
//! Every section is optional; a missing file yields the defaults. The models
//! directory can be overridden with the `MODELS_DIR` environment variable and the
//! file location with `INVENTORY_CONFIG`.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Model training settings
    pub training: TrainingConfig,
}

/// `[training]` section
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Directory where model artifacts are written
    pub models_dir: PathBuf,
    /// Hours between scheduled training runs
    pub interval_hours: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models_artifacts"),
            interval_hours: 24,
        }
    }
}

impl TrainingConfig {
    /// Interval between scheduled runs as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 60 * 60)
    }
}

/// Parses settings from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.training.interval_hours == 0 {
        return Err(Error::Config {
            message: "training.interval_hours must be greater than zero".to_string(),
        });
    }

    Ok(config)
}

/// Loads settings from a TOML file, falling back to defaults when it does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from `INVENTORY_CONFIG` (or `./config.toml`) and applies
/// environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("INVENTORY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(path)?;

    if let Ok(models_dir) = std::env::var("MODELS_DIR") {
        config.training.models_dir = PathBuf::from(models_dir);
    }

    Ok(config)
}
