//! WebSocket session client.
//!
//! Keeps one connection to the presentation server alive, re-sending the
//! hello after every reconnect so the server answers with a fresh snapshot.

mod client;
mod connection;
mod types;

pub use client::SessionClient;
#[cfg(test)]
pub(crate) use types::ClientCommand;
pub use types::{ClientConfig, ConnectionEvent};
