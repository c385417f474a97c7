//! Configuration and event/command enums for the session client.

use lectern_config::LecternConfig;
use lectern_session::{message_limit, ClientEvent, Role, ServerEvent};

/// Configuration for connecting to a lectern server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:3000/`.
    pub url: String,
    /// Role announced in the hello.
    pub role: Role,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// Largest incoming WebSocket message. `document_content` replies
    /// carry a whole document.
    pub max_message_bytes: usize,
}

impl ClientConfig {
    /// Connection settings from the `[viewer]` section, sized for the
    /// largest document `[storage]` allows.
    pub fn from_config(config: &LecternConfig, role: Role) -> Self {
        let viewer = &config.viewer;
        Self {
            url: viewer.url.clone(),
            role,
            reconnect_delay_secs: viewer.reconnect_delay_secs,
            max_reconnect_delay_secs: viewer.max_reconnect_delay_secs,
            max_message_bytes: message_limit(config.storage.max_upload_bytes()),
        }
    }
}

/// Events emitted by the session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connected and hello sent; a snapshot follows.
    Connected,
    /// Connection lost. A reconnect is scheduled unless the client was closed.
    Disconnected,
    Server(ServerEvent),
    Error(String),
}

/// Commands sent to the background connection task.
#[derive(Debug)]
pub(crate) enum ClientCommand {
    Send(ClientEvent),
    Disconnect,
}
