//! Public handle for interacting with the server connection.

use std::sync::Arc;

use lectern_common::LecternError;
use lectern_session::ClientEvent;
use tokio::sync::{mpsc, RwLock};

use super::connection::connection_loop;
use super::types::{ClientCommand, ClientConfig, ConnectionEvent};

/// Handle to the background connection task.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct SessionClient {
    command_tx: mpsc::Sender<ClientCommand>,
    connected: Arc<RwLock<bool>>,
}

impl SessionClient {
    /// Create a new client and start the background connection.
    /// Returns `(client, event_receiver)`.
    pub fn connect(config: ClientConfig) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));

        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };

        tokio::spawn(connection_loop(config, connected, event_tx, command_rx));

        (client, event_rx)
    }

    /// Queue an event for the server. Events sent while disconnected are dropped.
    pub async fn send(&self, event: ClientEvent) -> Result<(), LecternError> {
        self.command_tx
            .send(ClientCommand::Send(event))
            .await
            .map_err(|_| LecternError::Network("session client has shut down".into()))
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Close the connection and stop reconnecting.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(ClientCommand::Disconnect).await;
    }

    /// A client with no connection task; commands land on the returned receiver.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let client = Self {
            command_tx,
            connected: Arc::new(RwLock::new(true)),
        };
        (client, command_rx)
    }
}
