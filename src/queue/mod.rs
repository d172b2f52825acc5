//! FIFO matchmaking queue
//!
//! Holds participants awaiting an opponent and produces pairs fairly:
//! the two longest-waiting entries are always consumed first, so a newer
//! arrival can never skip ahead while two or more participants are waiting.

use crate::types::{ConnectionId, Participant};
use std::collections::VecDeque;

/// Ordered waiting pool of participants seeking an opponent
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: VecDeque<Participant>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a participant to the tail of the queue.
    ///
    /// Duplicate join requests from the same connection are idempotent:
    /// returns `false` and leaves the queue unchanged if the connection id
    /// is already enqueued.
    pub fn enqueue(&mut self, participant: Participant) -> bool {
        if self.contains(participant.connection_id) {
            return false;
        }
        self.waiting.push_back(participant);
        true
    }

    /// Remove and return the two longest-waiting participants, preserving
    /// arrival order. Returns `None` without blocking if fewer than two are
    /// waiting.
    pub fn try_dequeue_pair(&mut self) -> Option<(Participant, Participant)> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some((first, second))
    }

    /// Remove the participant with the given connection id if present.
    /// Returns the removed participant; `None` (not an error) if absent.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Participant> {
        let position = self
            .waiting
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        self.waiting.remove(position)
    }

    /// Whether a connection id is currently enqueued
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.waiting
            .iter()
            .any(|p| p.connection_id == connection_id)
    }

    /// Number of participants currently waiting
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
