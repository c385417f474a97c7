//! Presentation server configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind: String,
    pub port: u32,
    /// Per-participant outbound queue length. A participant that falls this
    /// far behind is disconnected and must rejoin.
    pub outbound_buffer: u32,
    /// Seconds a new connection has to identify itself.
    pub hello_timeout_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            outbound_buffer: 256,
            hello_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
