//! CLI command implementations.

pub mod config;
pub mod inspect;
pub mod report;

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use nfe_core::NfeConfig;

/// Load the configuration for a run.
///
/// An explicit `--config` path must exist. Without one, the default config
/// file is used when present, otherwise built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<NfeConfig> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let path = config::default_config_path();
            if !path.exists() {
                return Ok(NfeConfig::default());
            }
            path
        }
    };

    debug!("Loading configuration from {}", path.display());
    let config = NfeConfig::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
