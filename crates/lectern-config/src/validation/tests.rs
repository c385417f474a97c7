//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = LecternConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_port_zero() {
    let mut config = LecternConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn catches_port_too_large() {
    let mut config = LecternConfig::default();
    config.server.port = 65536;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn catches_zero_outbound_buffer() {
    let mut config = LecternConfig::default();
    config.server.outbound_buffer = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.outbound_buffer"));
}

#[test]
fn catches_empty_extension_list() {
    let mut config = LecternConfig::default();
    config.storage.allowed_extensions.clear();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("storage.allowed_extensions"));
}

#[test]
fn catches_dotted_extension() {
    let mut config = LecternConfig::default();
    config.storage.allowed_extensions = vec![".pdf".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("'.pdf'"));
}

#[test]
fn catches_upload_limit_out_of_range() {
    let mut config = LecternConfig::default();
    config.storage.max_upload_mb = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("storage.max_upload_mb"));
}

#[test]
fn catches_http_viewer_url() {
    let mut config = LecternConfig::default();
    config.viewer.url = "http://localhost:3000".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("viewer.url"));
}

#[test]
fn catches_inverted_reconnect_delays() {
    let mut config = LecternConfig::default();
    config.viewer.reconnect_delay_secs = 20;
    config.viewer.max_reconnect_delay_secs = 5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("viewer.max_reconnect_delay_secs"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = LecternConfig::default();
    config.server.port = 0;
    config.storage.max_upload_mb = 5000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
    assert!(err.contains("storage.max_upload_mb"));
    assert!(err.contains("; "));
}
