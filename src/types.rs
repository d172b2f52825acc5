//! Common types used throughout the duel service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque transport identity of a connected client. A reconnect is a new
/// identity with no continuity to any prior session.
pub type ConnectionId = Uuid;

/// Unique identifier for duel sessions (the "room id" on the wire)
pub type SessionId = Uuid;

/// Identifier of a problem in the external catalog
pub type ProblemId = String;

/// A connection-bound identity waiting for or engaged in a duel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, display_name: impl Into<String>) -> Self {
        Self {
            connection_id,
            display_name: display_name.into(),
        }
    }
}

/// Inbound messages (client -> server)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join the matchmaking queue under a display name
    StartMatchmaking { username: String },
    /// Leave the queue if still waiting
    CancelMatchmaking,
    /// Report a passing solution for a session
    #[serde(rename_all = "camelCase")]
    SubmitCorrectSolution { room_id: SessionId },
}

/// Outbound messages (server -> client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent to both paired participants when a session is created
    #[serde(rename_all = "camelCase")]
    MatchFound {
        room_id: SessionId,
        problem_id: ProblemId,
    },
    /// Sent to both participants when a session finishes
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner: ConnectionId,
        finished_at: DateTime<Utc>,
    },
    /// Sent to the remaining participant of an abandoned session
    OpponentDisconnected,
}
