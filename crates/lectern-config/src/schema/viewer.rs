//! Viewer client configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// WebSocket URL of the presentation server.
    pub url: String,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// How long to wait for a requested document before showing it as unavailable.
    pub fetch_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/".into(),
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            fetch_timeout_secs: 15,
        }
    }
}
