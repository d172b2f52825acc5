//! Outbound event delivery to connected clients
//!
//! The sink is the dispatcher's only way of talking back to connections.
//! Delivery is fire-and-forget: a failed send (peer already gone) is
//! reported as an error for the caller to log, never to abort on.

use crate::error::{DuelError, Result};
use crate::types::{ConnectionId, ServerMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Trait for sending server messages to a single connection
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Send a message to the given connection
    async fn send(&self, connection_id: ConnectionId, message: ServerMessage) -> Result<()>;
}

/// Event sink backed by per-connection mpsc channels.
///
/// The WebSocket layer registers an unbounded sender per accepted socket;
/// each connection task forwards queued messages onto its own socket, so a
/// slow peer never stalls dispatch for anyone else.
#[derive(Debug, Default)]
pub struct ChannelEventSink {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl ChannelEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel
    pub fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(connection_id, sender);
        }
    }

    /// Remove a connection's outbound channel
    pub fn unregister(&self, connection_id: ConnectionId) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(&connection_id);
        }
    }

    /// Number of currently registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn send(&self, connection_id: ConnectionId, message: ServerMessage) -> Result<()> {
        let sender = {
            let connections =
                self.connections
                    .read()
                    .map_err(|_| DuelError::InternalError {
                        message: "Failed to acquire connections lock".to_string(),
                    })?;
            connections.get(&connection_id).cloned()
        };

        match sender {
            Some(sender) => sender.send(message).map_err(|_| {
                DuelError::SendFailed {
                    connection_id: connection_id.to_string(),
                }
                .into()
            }),
            None => {
                debug!("No registered channel for connection {}", connection_id);
                Err(DuelError::SendFailed {
                    connection_id: connection_id.to_string(),
                }
                .into())
            }
        }
    }
}

/// Recording event sink for testing
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    sent: Mutex<Vec<(ConnectionId, ServerMessage)>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded (recipient, message) pairs in send order
    pub fn sent_messages(&self) -> Vec<(ConnectionId, ServerMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to one connection, in send order
    pub fn messages_for(&self, connection_id: ConnectionId) -> Vec<ServerMessage> {
        self.sent_messages()
            .into_iter()
            .filter(|(conn, _)| *conn == connection_id)
            .map(|(_, msg)| msg)
            .collect()
    }

    /// Clear recorded messages
    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn send(&self, connection_id: ConnectionId, message: ServerMessage) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((connection_id, message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_connection_id;

    #[tokio::test]
    async fn test_channel_sink_delivers_to_registered_connection() {
        let sink = ChannelEventSink::new();
        let connection_id = generate_connection_id();
        let (tx, mut rx) = mpsc::unbounded_channel();

        sink.register(connection_id, tx);
        sink.send(connection_id, ServerMessage::OpponentDisconnected)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::OpponentDisconnected));
    }

    #[tokio::test]
    async fn test_channel_sink_send_to_unknown_connection_fails() {
        let sink = ChannelEventSink::new();
        let result = sink
            .send(generate_connection_id(), ServerMessage::OpponentDisconnected)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_channel_sink_unregister() {
        let sink = ChannelEventSink::new();
        let connection_id = generate_connection_id();
        let (tx, _rx) = mpsc::unbounded_channel();

        sink.register(connection_id, tx);
        assert_eq!(sink.connection_count(), 1);

        sink.unregister(connection_id);
        assert_eq!(sink.connection_count(), 0);
        assert!(sink
            .send(connection_id, ServerMessage::OpponentDisconnected)
            .await
            .is_err());
    }
}
