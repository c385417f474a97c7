//! Command-line and environment overrides on top of the config file.

use std::path::PathBuf;

use lectern_common::ConfigError;
use lectern_config::{validation, LecternConfig};

/// Values that beat the config file. `env_port` is the raw `$PORT`.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<u32>,
    pub env_port: Option<String>,
    pub upload_dir: Option<PathBuf>,
}

/// Apply overrides, then validate again so an override cannot smuggle in
/// a value the file would have been rejected for.
///
/// Precedence: `--port` over `$PORT` over the file.
pub fn apply_overrides(config: &mut LecternConfig, overrides: Overrides) -> Result<(), ConfigError> {
    if let Some(raw) = overrides.env_port.filter(|raw| !raw.trim().is_empty()) {
        config.server.port = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("PORT = {raw:?} is not a port number"))
        })?;
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if let Some(dir) = overrides.upload_dir {
        config.storage.upload_dir = dir;
    }
    validation::validate(config)
}
