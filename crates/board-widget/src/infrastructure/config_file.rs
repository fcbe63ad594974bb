//! Loads [`WidgetConfig`] from a TOML file on disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::config::WidgetConfig;

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Reads and parses the file at `path`.
///
/// Fields the file leaves out keep their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<WidgetConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = WidgetConfig::from_toml_str(&content)?;
    info!("loaded configuration from {}", path.display());
    Ok(config)
}
