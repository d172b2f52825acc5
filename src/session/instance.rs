//! Session instance and its state machine
//!
//! A session is the paired, timed duel between exactly two participants
//! around one problem. Status transitions are monotonic and one-directional:
//! Active -> Finished or Active -> Abandoned, nothing after that.

use crate::types::{ConnectionId, Participant, ProblemId, SessionId};
use crate::utils::{current_timestamp, generate_session_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a duel session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Both participants are paired and duelling (initial state)
    Active,
    /// One participant submitted a passing solution (terminal)
    Finished,
    /// One participant disconnected before a submission (terminal)
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Abandoned)
    }
}

/// An active two-participant duel session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub participants: [Participant; 2],
    pub problem_id: ProblemId,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl Session {
    /// Create a new Active session for two distinct participants
    pub fn new(a: Participant, b: Participant, problem_id: ProblemId) -> Self {
        debug_assert_ne!(a.connection_id, b.connection_id);
        Self {
            id: generate_session_id(),
            participants: [a, b],
            problem_id,
            started_at: current_timestamp(),
            status: SessionStatus::Active,
        }
    }

    /// Whether the given connection is one of the two participants
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection_id == connection_id)
    }

    /// The participant opposite to the given connection, if it is a member
    pub fn opponent_of(&self, connection_id: ConnectionId) -> Option<&Participant> {
        if !self.contains(connection_id) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.connection_id != connection_id)
    }
}

/// Result of the first successful `finish` on a session
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub session: Session,
    pub winner: ConnectionId,
    pub finished_at: DateTime<Utc>,
}
