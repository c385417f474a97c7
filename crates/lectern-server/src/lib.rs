//! lectern-server: WebSocket front end for the session hub.
//!
//! Accepts WebSocket connections, classifies each one by its hello frame,
//! joins it to the hub, and pumps events both ways. Document storage
//! requests are served from the connection task so slow disk I/O never
//! holds up the hub.

pub mod connection;
pub mod settings;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lectern_session::{DocumentStore, HubHandle};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::connection::handle_connection;

/// Everything a connection task needs, cheap to clone per connection.
#[derive(Clone)]
pub struct ServerContext {
    pub hub: HubHandle,
    pub store: Arc<dyn DocumentStore>,
    pub hello_timeout: Duration,
    /// Largest accepted WebSocket message; must fit a base64 upload of the
    /// biggest allowed document (see [`lectern_session::message_limit`]).
    pub max_message_bytes: usize,
}

impl ServerContext {
    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_bytes))
            .max_frame_size(Some(self.max_message_bytes))
    }
}

/// Accept connections forever.
pub async fn serve(listener: TcpListener, ctx: ServerContext) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("lectern-server listening on {}", addr);
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move { accept(stream, addr, ctx).await });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

async fn accept(stream: tokio::net::TcpStream, addr: SocketAddr, ctx: ServerContext) {
    match accept_async_with_config(stream, Some(ctx.ws_config())).await {
        Ok(ws) => handle_connection(ws, addr, ctx).await,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
        }
    }
}
