//! Session registry: the authoritative owner of active duel sessions
//!
//! The registry enforces first-writer-wins finalization: exactly one of
//! `finish`/`abandon` takes effect per session, and the terminal session is
//! removed from the active set in the same step. A losing racer observes
//! `None` and performs no side effects. Callers serialize access through a
//! single lock owned by the dispatcher.

use crate::session::instance::{FinishedSession, Session, SessionStatus};
use crate::types::{ConnectionId, Participant, ProblemId, SessionId};
use crate::utils::current_timestamp;
use std::collections::HashMap;

/// Registry of all sessions that have not yet reached a terminal status
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Active session for two participants and register it.
    /// Session ids are process-unique UUIDs, never reused.
    pub fn create(&mut self, a: Participant, b: Participant, problem_id: ProblemId) -> SessionId {
        let session = Session::new(a, b, problem_id);
        let session_id = session.id;
        self.active.insert(session_id, session);
        session_id
    }

    /// Read-only lookup of an active session
    pub fn get(&self, session_id: SessionId) -> Option<&Session> {
        self.active.get(&session_id)
    }

    /// Transition a session to Finished, recording the winner and completion
    /// time, and remove it from the active set.
    ///
    /// Returns `None` with no mutation if the session does not exist or has
    /// already been finalized; only the caller that receives `Some` may
    /// broadcast the game-over event.
    pub fn finish(
        &mut self,
        session_id: SessionId,
        winner: ConnectionId,
    ) -> Option<FinishedSession> {
        // Submissions are only valid from a session member.
        if !self.active.get(&session_id)?.contains(winner) {
            return None;
        }
        let mut session = self.active.remove(&session_id)?;
        session.status = SessionStatus::Finished;
        Some(FinishedSession {
            session,
            winner,
            finished_at: current_timestamp(),
        })
    }

    /// Transition the (at most one) active session containing the given
    /// connection to Abandoned and remove it from the active set.
    ///
    /// Returns the abandoned session together with the other participant for
    /// notification; `None` if the connection is in no active session.
    pub fn abandon(
        &mut self,
        connection_id: ConnectionId,
    ) -> Option<(Session, Participant)> {
        let session_id = self
            .active
            .values()
            .find(|s| s.contains(connection_id))
            .map(|s| s.id)?;

        let mut session = self.active.remove(&session_id)?;
        session.status = SessionStatus::Abandoned;
        let other = session.opponent_of(connection_id)?.clone();
        Some((session, other))
    }

    /// Whether a connection is a participant of any active session
    pub fn contains_connection(&self, connection_id: ConnectionId) -> bool {
        self.active.values().any(|s| s.contains(connection_id))
    }

    /// Number of active sessions
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
