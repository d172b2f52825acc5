//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the duel-arena service
//! covering queue activity and session lifecycle.

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Main metrics collector for the duel service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Session-related metrics
    session_metrics: SessionMetrics,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Total join requests accepted into the queue
    pub players_queued_total: IntCounter,

    /// Total explicit cancellations removed from the queue
    pub queue_cancels_total: IntCounter,

    /// Participants currently waiting for an opponent
    pub players_waiting: IntGauge,
}

/// Session-related metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Total sessions created by pairing
    pub sessions_created_total: IntCounter,

    /// Total sessions finished by a winning submission
    pub sessions_finished_total: IntCounter,

    /// Total sessions abandoned by a disconnect
    pub sessions_abandoned_total: IntCounter,

    /// Currently active sessions
    pub active_sessions: IntGauge,

    /// Duration from pairing to terminal transition
    pub session_duration_seconds: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let queue_metrics = QueueMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;

        Ok(Self {
            registry,
            queue_metrics,
            session_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get session metrics
    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    /// Record a session reaching a terminal state
    pub fn record_session_ended(&self, duration_seconds: f64, abandoned: bool) {
        if abandoned {
            self.session_metrics.sessions_abandoned_total.inc();
        } else {
            self.session_metrics.sessions_finished_total.inc();
        }
        self.session_metrics.active_sessions.dec();
        self.session_metrics
            .session_duration_seconds
            .observe(duration_seconds);
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_queued_total = IntCounter::with_opts(Opts::new(
            "duel_players_queued_total",
            "Total join requests accepted into the matchmaking queue",
        ))?;
        registry.register(Box::new(players_queued_total.clone()))?;

        let queue_cancels_total = IntCounter::with_opts(Opts::new(
            "duel_queue_cancels_total",
            "Total explicit cancellations removed from the queue",
        ))?;
        registry.register(Box::new(queue_cancels_total.clone()))?;

        let players_waiting = IntGauge::with_opts(Opts::new(
            "duel_players_waiting",
            "Participants currently waiting for an opponent",
        ))?;
        registry.register(Box::new(players_waiting.clone()))?;

        Ok(Self {
            players_queued_total,
            queue_cancels_total,
            players_waiting,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sessions_created_total = IntCounter::with_opts(Opts::new(
            "duel_sessions_created_total",
            "Total duel sessions created by pairing",
        ))?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_finished_total = IntCounter::with_opts(Opts::new(
            "duel_sessions_finished_total",
            "Total duel sessions finished by a winning submission",
        ))?;
        registry.register(Box::new(sessions_finished_total.clone()))?;

        let sessions_abandoned_total = IntCounter::with_opts(Opts::new(
            "duel_sessions_abandoned_total",
            "Total duel sessions abandoned by a disconnect",
        ))?;
        registry.register(Box::new(sessions_abandoned_total.clone()))?;

        let active_sessions = IntGauge::with_opts(Opts::new(
            "duel_active_sessions",
            "Currently active duel sessions",
        ))?;
        registry.register(Box::new(active_sessions.clone()))?;

        let session_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "duel_session_duration_seconds",
                "Duration from pairing to terminal transition",
            )
            .buckets(vec![
                10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0,
            ]),
        )?;
        registry.register(Box::new(session_duration_seconds.clone()))?;

        Ok(Self {
            sessions_created_total,
            sessions_finished_total,
            sessions_abandoned_total,
            active_sessions,
            session_duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_registers_metrics() {
        let collector = MetricsCollector::new().unwrap();
        collector.queue().players_queued_total.inc();
        collector.session().sessions_created_total.inc();
        collector.session().active_sessions.inc();
        collector.record_session_ended(42.0, false);

        let families = collector.registry().gather();
        let names: Vec<String> = families.iter().map(|f| f.get_name().to_string()).collect();

        assert!(names.iter().any(|n| n.contains("players_queued")));
        assert!(names.iter().any(|n| n.contains("sessions_created")));
        assert!(names.iter().any(|n| n.contains("session_duration")));
    }

    #[test]
    fn test_record_session_ended_counts() {
        let collector = MetricsCollector::new().unwrap();
        collector.session().active_sessions.set(2);

        collector.record_session_ended(10.0, false);
        collector.record_session_ended(20.0, true);

        assert_eq!(collector.session().sessions_finished_total.get(), 1);
        assert_eq!(collector.session().sessions_abandoned_total.get(), 1);
        assert_eq!(collector.session().active_sessions.get(), 0);
    }
}
