//! Full configuration validation.
//!
//! Checks numeric ranges and list contents across every section and
//! collects all problems into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::LecternConfig;
use lectern_common::ConfigError;

use helpers::{validate_range, validate_range_u64};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LecternConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_storage(&mut errors, config);
    validate_viewer(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &LecternConfig) {
    validate_range(errors, "server.port", config.server.port, 1, 65535);
    validate_range(
        errors,
        "server.outbound_buffer",
        config.server.outbound_buffer,
        1,
        65536,
    );
    validate_range(
        errors,
        "server.hello_timeout_secs",
        config.server.hello_timeout_secs,
        1,
        300,
    );
    if config.server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
}

fn validate_storage(errors: &mut Vec<String>, config: &LecternConfig) {
    validate_range(
        errors,
        "storage.max_upload_mb",
        config.storage.max_upload_mb,
        1,
        1024,
    );
    if config.storage.allowed_extensions.is_empty() {
        errors.push("storage.allowed_extensions must list at least one extension".into());
    }
    for ext in &config.storage.allowed_extensions {
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            errors.push(format!(
                "storage.allowed_extensions entry '{ext}' must be a bare extension like \"pdf\""
            ));
        }
    }
}

fn validate_viewer(errors: &mut Vec<String>, config: &LecternConfig) {
    let viewer = &config.viewer;
    if !(viewer.url.starts_with("ws://") || viewer.url.starts_with("wss://")) {
        errors.push(format!(
            "viewer.url = {} must use ws:// or wss://",
            viewer.url
        ));
    }
    validate_range_u64(
        errors,
        "viewer.reconnect_delay_secs",
        viewer.reconnect_delay_secs,
        1,
        300,
    );
    validate_range_u64(
        errors,
        "viewer.max_reconnect_delay_secs",
        viewer.max_reconnect_delay_secs,
        1,
        3600,
    );
    if viewer.max_reconnect_delay_secs < viewer.reconnect_delay_secs {
        errors.push(format!(
            "viewer.max_reconnect_delay_secs = {} is below viewer.reconnect_delay_secs = {}",
            viewer.max_reconnect_delay_secs, viewer.reconnect_delay_secs
        ));
    }
    validate_range_u64(
        errors,
        "viewer.fetch_timeout_secs",
        viewer.fetch_timeout_secs,
        1,
        600,
    );
}
