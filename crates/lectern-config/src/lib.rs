//! Lectern configuration system.
//!
//! TOML-based configuration for the presentation server and viewer client.
//! Every section uses serde defaults, so a partial file (or no file at all)
//! yields a working setup.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lectern_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LecternConfig, LogLevel, LoggingConfig, ServerConfig, StorageConfig, ViewerConfig,
    CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use lectern_common::ConfigError;

/// Load config from `path`, or from the platform default location when
/// `path` is `None`, then validate it.
pub fn load_config(path: Option<&Path>) -> Result<LecternConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LecternConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = LecternConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"storage\""));
        assert!(json.contains("\"viewer\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = LecternConfig::default();
        let json = config_to_json(&config);
        let parsed: LecternConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.storage.max_upload_mb, 50);
        assert_eq!(parsed.viewer.fetch_timeout_secs, 15);
    }

    #[test]
    fn load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lectern.toml");
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 4100);
    }
}
