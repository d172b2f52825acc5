//! Connection dispatcher: the protocol boundary of the duel core
//!
//! The dispatcher is the only component that talks to the outside world. It
//! owns no domain state itself: inbound events are translated into queue and
//! registry operations under the corresponding store lock, and the outcomes
//! are fanned out through the event sink strictly after the locks are
//! released, so a slow or failing send can never stall pairing or
//! finalization for other connections.

use crate::dispatch::sink::EventSink;
use crate::error::{DuelError, Result};
use crate::metrics::MetricsCollector;
use crate::problem::ProblemProvider;
use crate::queue::MatchmakingQueue;
use crate::session::SessionRegistry;
use crate::types::{ClientMessage, ConnectionId, Participant, ServerMessage, SessionId};
use crate::utils::current_timestamp;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about dispatcher operations
#[derive(Debug, Clone, Default)]
pub struct DispatcherStats {
    /// Total join requests accepted into the queue
    pub players_queued: u64,
    /// Total sessions created by pairing
    pub sessions_created: u64,
    /// Total sessions finished by a winning submission
    pub sessions_finished: u64,
    /// Total sessions abandoned by a disconnect
    pub sessions_abandoned: u64,
    /// Participants currently waiting in the queue
    pub players_waiting: usize,
    /// Currently active sessions
    pub active_sessions: usize,
}

/// The connection dispatcher
pub struct Dispatcher {
    /// Waiting pool of participants seeking an opponent
    queue: RwLock<MatchmakingQueue>,
    /// Authoritative registry of active sessions
    registry: RwLock<SessionRegistry>,
    /// Problem catalog for new sessions
    problems: Arc<dyn ProblemProvider>,
    /// Outbound message delivery
    sink: Arc<dyn EventSink>,
    /// Dispatcher statistics
    stats: RwLock<DispatcherStats>,
    /// Metrics collector
    metrics: Arc<MetricsCollector>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(
        problems: Arc<dyn ProblemProvider>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            queue: RwLock::new(MatchmakingQueue::new()),
            registry: RwLock::new(SessionRegistry::new()),
            problems,
            sink,
            stats: RwLock::new(DispatcherStats::default()),
            metrics,
        }
    }

    /// Route a single inbound client message
    pub async fn handle_message(
        &self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<()> {
        match message {
            ClientMessage::StartMatchmaking { username } => {
                self.handle_join(connection_id, username).await
            }
            ClientMessage::CancelMatchmaking => self.handle_cancel(connection_id),
            ClientMessage::SubmitCorrectSolution { room_id } => {
                self.handle_submit(connection_id, room_id).await
            }
        }
    }

    /// Handle a join request: enqueue the participant and attempt pairing
    pub async fn handle_join(&self, connection_id: ConnectionId, username: String) -> Result<()> {
        info!(
            "Processing join request - connection: {}, username: '{}'",
            connection_id, username
        );

        // A connection already in an active session can never be queued at
        // the same time.
        {
            let registry = self
                .registry
                .read()
                .map_err(|_| DuelError::InternalError {
                    message: "Failed to acquire registry lock".to_string(),
                })?;
            if registry.contains_connection(connection_id) {
                debug!(
                    "Join ignored - connection {} is already in an active session",
                    connection_id
                );
                return Ok(());
            }
        }

        let participant = Participant::new(connection_id, username);

        // Dequeuing a pair and registering its session happen under the same
        // queue lock (lock order: queue, then registry). A concurrent
        // disconnect therefore either still finds its entry in the queue or
        // already finds the session in the registry; the paired participants
        // are never in neither store.
        let (accepted, created, waiting) = {
            let mut queue = self.queue.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire queue lock".to_string(),
            })?;
            let accepted = queue.enqueue(participant);
            if !accepted {
                debug!(
                    "Duplicate join from connection {} - already queued",
                    connection_id
                );
            }
            let created = match queue.try_dequeue_pair() {
                Some((first, second)) => {
                    let problem_id = self.problems.select();
                    let mut registry =
                        self.registry
                            .write()
                            .map_err(|_| DuelError::InternalError {
                                message: "Failed to acquire registry lock".to_string(),
                            })?;
                    let session_id =
                        registry.create(first.clone(), second.clone(), problem_id.clone());
                    Some((session_id, problem_id, first, second))
                }
                None => None,
            };
            (accepted, created, queue.len())
        };

        if accepted {
            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.players_queued += 1;
            stats.players_waiting = waiting;
            self.metrics.queue().players_queued_total.inc();
        }
        self.metrics.queue().players_waiting.set(waiting as i64);

        let Some((session_id, problem_id, first, second)) = created else {
            debug!(
                "No opponent available yet - connection {} waiting ({} queued)",
                connection_id, waiting
            );
            return Ok(());
        };

        {
            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.sessions_created += 1;
            stats.active_sessions += 1;
        }
        self.metrics.session().sessions_created_total.inc();
        self.metrics.session().active_sessions.inc();

        info!(
            "Match found - session: {}, problem: '{}', participants: '{}' vs '{}'",
            session_id, problem_id, first.display_name, second.display_name
        );

        let message = ServerMessage::MatchFound {
            room_id: session_id,
            problem_id,
        };
        self.broadcast(&[first.connection_id, second.connection_id], message)
            .await;

        Ok(())
    }

    /// Handle an explicit cancellation: remove from the queue if present.
    /// No outbound message on success or no-op.
    pub fn handle_cancel(&self, connection_id: ConnectionId) -> Result<()> {
        let (removed, waiting) = {
            let mut queue = self.queue.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire queue lock".to_string(),
            })?;
            (queue.remove(connection_id).is_some(), queue.len())
        };

        if removed {
            info!("Connection {} cancelled matchmaking", connection_id);
            self.metrics.queue().queue_cancels_total.inc();
            self.metrics.queue().players_waiting.set(waiting as i64);

            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.players_waiting = waiting;
        } else {
            debug!(
                "Cancel from connection {} not in queue - no-op",
                connection_id
            );
        }

        Ok(())
    }

    /// Handle a submission report: finalize the session if it is still
    /// active. Late or racing submissions resolve as idempotent silence.
    pub async fn handle_submit(
        &self,
        connection_id: ConnectionId,
        room_id: SessionId,
    ) -> Result<()> {
        let finished = {
            let mut registry = self
                .registry
                .write()
                .map_err(|_| DuelError::InternalError {
                    message: "Failed to acquire registry lock".to_string(),
                })?;
            registry.finish(room_id, connection_id)
        };

        let Some(finished) = finished else {
            debug!(
                "Submission for session {} from {} had no effect - unknown or already terminal",
                room_id, connection_id
            );
            return Ok(());
        };

        let duration = (finished.finished_at - finished.session.started_at)
            .num_milliseconds() as f64
            / 1000.0;

        info!(
            "Session {} finished - winner: {}, duration: {:.1}s",
            room_id, finished.winner, duration
        );

        {
            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.sessions_finished += 1;
            stats.active_sessions = stats.active_sessions.saturating_sub(1);
        }
        self.metrics.record_session_ended(duration, false);

        let recipients: Vec<ConnectionId> = finished
            .session
            .participants
            .iter()
            .map(|p| p.connection_id)
            .collect();
        let message = ServerMessage::GameOver {
            winner: finished.winner,
            finished_at: finished.finished_at,
        };
        self.broadcast(&recipients, message).await;

        Ok(())
    }

    /// Handle a closed connection: remove it from the queue (queued case)
    /// and abandon its active session (in-session case). Both are safe
    /// no-ops when not applicable.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) -> Result<()> {
        let (removed, waiting) = {
            let mut queue = self.queue.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire queue lock".to_string(),
            })?;
            (queue.remove(connection_id).is_some(), queue.len())
        };

        if removed {
            debug!(
                "Removed disconnected connection {} from queue",
                connection_id
            );
            self.metrics.queue().players_waiting.set(waiting as i64);
            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.players_waiting = waiting;
        }

        let abandoned = {
            let mut registry = self
                .registry
                .write()
                .map_err(|_| DuelError::InternalError {
                    message: "Failed to acquire registry lock".to_string(),
                })?;
            registry.abandon(connection_id)
        };

        let Some((session, other)) = abandoned else {
            return Ok(());
        };

        let duration =
            (current_timestamp() - session.started_at).num_milliseconds() as f64 / 1000.0;

        info!(
            "Session {} abandoned - connection {} disconnected, notifying '{}'",
            session.id, connection_id, other.display_name
        );

        {
            let mut stats = self.stats.write().map_err(|_| DuelError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.sessions_abandoned += 1;
            stats.active_sessions = stats.active_sessions.saturating_sub(1);
        }
        self.metrics.record_session_ended(duration, true);

        self.broadcast(&[other.connection_id], ServerMessage::OpponentDisconnected)
            .await;

        Ok(())
    }

    /// Send a message to each recipient, logging failures without aborting:
    /// a peer that dropped between finalize and send is not an error for
    /// anyone else.
    async fn broadcast(&self, recipients: &[ConnectionId], message: ServerMessage) {
        for &connection_id in recipients {
            if let Err(e) = self.sink.send(connection_id, message.clone()).await {
                warn!(
                    "Failed to deliver {:?} to connection {}: {}",
                    message, connection_id, e
                );
            }
        }
    }

    /// Get current dispatcher statistics
    pub fn get_stats(&self) -> Result<DispatcherStats> {
        let stats = self.stats.read().map_err(|_| DuelError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;
        Ok(stats.clone())
    }

    /// Number of participants currently waiting in the queue
    pub fn waiting_count(&self) -> usize {
        self.queue.read().map(|q| q.len()).unwrap_or(0)
    }

    /// Number of currently active sessions
    pub fn active_session_count(&self) -> usize {
        self.registry.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether a connection is currently queued (used by tests and health)
    pub fn is_queued(&self, connection_id: ConnectionId) -> bool {
        self.queue
            .read()
            .map(|q| q.contains(connection_id))
            .unwrap_or(false)
    }
}
