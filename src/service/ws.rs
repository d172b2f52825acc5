//! Per-connection WebSocket handling
//!
//! Each accepted socket gets a freshly generated connection id; the identity
//! is purely transport-scoped, so a reconnect is a brand-new participant
//! with no continuity to any prior session. The connection task forwards
//! queued outbound messages to the socket and feeds inbound frames to the
//! dispatcher; socket close (or read error) triggers queue removal and
//! session abandonment.

use crate::service::app::AppState;
use crate::types::{ClientMessage, ServerMessage};
use crate::utils::generate_connection_id;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler - spawns a per-connection task
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection event loop
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let connection_id = generate_connection_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    state.sink().register(connection_id, tx);
    info!("Connection {} opened", connection_id);

    loop {
        tokio::select! {
            // Outbound: forward queued ServerMessage to the socket.
            Some(msg) = rx.recv() => {
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to serialize outbound message: {}", e);
                    }
                }
            }
            // Inbound: read from the socket.
            maybe_msg = socket.recv() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                // Malformed frames are dropped, never fatal.
                                warn!(
                                    "Dropping malformed message from {}: {}",
                                    connection_id, e
                                );
                                continue;
                            }
                        };

                        if let Err(e) = state
                            .dispatcher()
                            .handle_message(connection_id, client_msg)
                            .await
                        {
                            error!(
                                "Failed to handle message from {}: {}",
                                connection_id, e
                            );
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("Read error on connection {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    }

    // Disconnected: stop accepting outbound sends for this connection, then
    // clean up queue membership and abandon any active session.
    state.sink().unregister(connection_id);
    if let Err(e) = state.dispatcher().handle_disconnect(connection_id).await {
        error!("Disconnect cleanup failed for {}: {}", connection_id, e);
    }
    info!("Connection {} closed", connection_id);
}
