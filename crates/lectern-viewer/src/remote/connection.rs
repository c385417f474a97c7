//! Background WebSocket connection loop with auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lectern_session::{Hello, ServerEvent};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};

use super::types::{ClientCommand, ClientConfig, ConnectionEvent};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// How a live connection ended.
enum Outcome {
    Reconnect,
    Stop,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the WebSocket connection with auto-reconnect.
pub(crate) async fn connection_loop(
    config: ClientConfig,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut command_rx: mpsc::Receiver<ClientCommand>,
) {
    let mut reconnect_delay = config.reconnect_delay_secs;
    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(config.max_message_bytes))
        .max_frame_size(Some(config.max_message_bytes));

    loop {
        info!(url = %config.url, role = ?config.role, "Connecting to lectern server");

        match tokio::time::timeout(
            CONNECT_TIMEOUT,
            tokio_tungstenite::connect_async_with_config(config.url.as_str(), Some(ws_config), false),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                let (mut ws_write, mut ws_read) = ws_stream.split();

                // Every (re)connect announces the role again; the server
                // answers with a fresh snapshot.
                let hello = match serde_json::to_string(&Hello::for_role(config.role)) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to encode hello");
                        return;
                    }
                };
                if let Err(e) = ws_write.send(WsMessage::Text(hello.into())).await {
                    warn!(error = %e, "Failed to send hello");
                } else {
                    *connected.write().await = true;
                    let _ = event_tx.send(ConnectionEvent::Connected).await;

                    let outcome = loop {
                        tokio::select! {
                            cmd = command_rx.recv() => match cmd {
                                Some(ClientCommand::Send(event)) => {
                                    let json = match serde_json::to_string(&event) {
                                        Ok(json) => json,
                                        Err(e) => {
                                            warn!(error = %e, "Failed to encode client event");
                                            continue;
                                        }
                                    };
                                    if ws_write.send(WsMessage::Text(json.into())).await.is_err() {
                                        break Outcome::Reconnect;
                                    }
                                }
                                Some(ClientCommand::Disconnect) | None => {
                                    let _ = ws_write.send(WsMessage::Close(None)).await;
                                    break Outcome::Stop;
                                }
                            },

                            msg = ws_read.next() => match msg {
                                Some(Ok(WsMessage::Text(text))) => {
                                    match serde_json::from_str::<ServerEvent>(&text) {
                                        Ok(event) => {
                                            if event_tx.send(ConnectionEvent::Server(event)).await.is_err() {
                                                let _ = ws_write.send(WsMessage::Close(None)).await;
                                                break Outcome::Stop;
                                            }
                                        }
                                        Err(e) => {
                                            tracing::debug!(error = %e, "Unrecognized message from server");
                                        }
                                    }
                                }
                                Some(Ok(WsMessage::Ping(data))) => {
                                    let _ = ws_write.send(WsMessage::Pong(data)).await;
                                }
                                Some(Ok(WsMessage::Close(_))) | None => {
                                    info!("Server closed connection");
                                    break Outcome::Reconnect;
                                }
                                Some(Err(e)) => {
                                    warn!(error = %e, "WebSocket error");
                                    break Outcome::Reconnect;
                                }
                                _ => {}
                            },
                        }
                    };

                    *connected.write().await = false;
                    let _ = event_tx.send(ConnectionEvent::Disconnected).await;
                    if let Outcome::Stop = outcome {
                        info!("Session client stopped");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to lectern server");
                let _ = event_tx
                    .send(ConnectionEvent::Error(format!("Connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                error!("WebSocket connection timed out after 15s");
                let _ = event_tx
                    .send(ConnectionEvent::Error(
                        "Connection timed out after 15s".to_string(),
                    ))
                    .await;
            }
        }

        // Exponential backoff reconnect. Sends issued while offline are
        // dropped; the next snapshot supersedes them.
        info!(
            delay = reconnect_delay,
            "Reconnecting in {} seconds", reconnect_delay
        );
        let sleep = tokio::time::sleep(Duration::from_secs(reconnect_delay));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = command_rx.recv() => match cmd {
                    Some(ClientCommand::Send(event)) => {
                        tracing::debug!(event = ?event, "Dropping event while disconnected");
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        info!("Session client stopped");
                        return;
                    }
                },
            }
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay_secs);
    }
}
