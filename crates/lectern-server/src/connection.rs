//! Per-connection handler: classify, join, then pump events.
//!
//! Lifecycle: `Connecting` (waiting for the hello) → `Active` (joined, the
//! snapshot has been written) → `Disconnected` (left the hub).

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use lectern_common::StorageError;
use lectern_session::protocol::decode_payload;
use lectern_session::{
    can_mutate, ClientEvent, Hello, HubError, Mutation, Participant, Role, ServerEvent,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::ServerContext;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    ctx: ServerContext,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Connecting: the hello decides the role.
    let Some(role) = read_hello(&mut stream, addr, ctx.hello_timeout).await else {
        return;
    };

    // 2. Join the hub. The snapshot is already queued for us.
    let mut membership = match ctx.hub.join(role).await {
        Ok(membership) => membership,
        Err(e) => {
            tracing::error!(peer = %addr, error = %e, "Could not join session");
            let _ = send_event(
                &mut sink,
                &ServerEvent::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };
    let participant = membership.participant.clone();

    tracing::info!(
        peer = %addr,
        participant = %participant.id,
        role = ?role,
        "Client connected"
    );

    // 3. Write the snapshot before anything else can reach the socket.
    let snapshot_sent = match membership.events.recv().await {
        Some(snapshot) => send_event(&mut sink, &snapshot).await.is_ok(),
        None => false,
    };

    // 4. Active: forward hub events out, client frames in.
    if snapshot_sent {
        loop {
            tokio::select! {
                event = membership.events.recv() => {
                    let Some(event) = event else {
                        tracing::info!(participant = %participant.id, "Dropped by hub");
                        break;
                    };
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match handle_frame(&ctx, &participant, &text).await {
                                Ok(Some(reply)) => {
                                    if send_event(&mut sink, &reply).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    tracing::error!(participant = %participant.id, error = %e, "Hub unavailable");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!(peer = %addr, error = %e, "WS error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    // 5. Disconnected.
    tracing::info!(
        peer = %addr,
        participant = %participant.id,
        role = ?role,
        "Client disconnected"
    );
    let _ = ctx.hub.leave(&participant.id).await;
}

/// Act on one client frame. Returns the direct reply, if the event has one.
async fn handle_frame(
    ctx: &ServerContext,
    participant: &Participant,
    text: &str,
) -> Result<Option<ServerEvent>, HubError> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(participant = %participant.id, error = %e, "Ignoring invalid frame");
            return Ok(None);
        }
    };

    if let Some(mutation) = event.as_mutation() {
        ctx.hub.submit(&participant.id, mutation).await?;
        return Ok(None);
    }

    let reply = match event {
        ClientEvent::ListDocuments => match ctx.store.list().await {
            Ok(documents) => ServerEvent::DocumentList { documents },
            Err(e) => storage_failure(participant, "list", e),
        },
        ClientEvent::FetchDocument { document } => match ctx.store.fetch(&document).await {
            Ok(bytes) => ServerEvent::content(document, Some(&bytes)),
            Err(StorageError::NotFound(_)) => ServerEvent::content(document, None),
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "Document fetch failed");
                ServerEvent::content(document, None)
            }
        },
        ClientEvent::UploadDocument { name, data } => {
            if !authorized(participant, "upload") {
                return Ok(None);
            }
            let bytes = match decode_payload(&data) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Ok(Some(ServerEvent::Error {
                        message: e.to_string(),
                    }))
                }
            };
            match ctx.store.upload(&name, bytes).await {
                Ok(document) => {
                    // Selecting goes through the hub like any other mutation.
                    ctx.hub
                        .submit(&participant.id, Mutation::SelectDocument(document.clone()))
                        .await?;
                    ServerEvent::Uploaded { document }
                }
                Err(e) => storage_failure(participant, "upload", e),
            }
        }
        ClientEvent::ClearDocuments => {
            if !authorized(participant, "clear") {
                return Ok(None);
            }
            match ctx.store.clear().await {
                Ok(removed) => ServerEvent::Cleared { removed },
                Err(e) => storage_failure(participant, "clear", e),
            }
        }
        ClientEvent::PageChange { .. } | ClientEvent::SelectDocument { .. } => return Ok(None),
    };

    Ok(Some(reply))
}

/// Storage-changing requests are presenter-only. Rejections get no reply.
fn authorized(participant: &Participant, action: &str) -> bool {
    if can_mutate(participant) {
        return true;
    }
    tracing::warn!(
        participant = %participant.id,
        role = ?participant.role,
        action,
        "Request rejected: participant is not the presenter"
    );
    false
}

fn storage_failure(participant: &Participant, action: &str, e: StorageError) -> ServerEvent {
    tracing::warn!(participant = %participant.id, action, error = %e, "Storage request failed");
    ServerEvent::Error {
        message: e.to_string(),
    }
}

/// Read and parse the first message as a Hello.
async fn read_hello(stream: &mut WsStream, addr: SocketAddr, timeout: Duration) -> Option<Role> {
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<Hello>(&text) {
            Ok(hello) => Some(hello.role()),
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid hello message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text hello, got another frame type");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during hello");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before hello");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, timeout_secs = timeout.as_secs(), "Hello timeout");
            None
        }
    }
}

/// Send a ServerEvent as a JSON text frame.
async fn send_event(
    sink: &mut WsSink,
    event: &ServerEvent,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
