//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the problem
//! catalog, dispatcher, event sink, and metrics together and serves the
//! WebSocket and monitoring endpoints over a single axum router.

use crate::config::AppConfig;
use crate::dispatch::{ChannelEventSink, Dispatcher};
use crate::metrics::MetricsCollector;
use crate::problem::StaticProblemCatalog;
use crate::service::health::HealthCheck;
use crate::service::ws::ws_handler;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core dispatcher handling all inbound events
    dispatcher: Arc<Dispatcher>,

    /// Outbound delivery registry for connected sockets
    sink: Arc<ChannelEventSink>,

    /// Metrics collector
    metrics: Arc<MetricsCollector>,

    /// Service start time for uptime reporting
    started_at: DateTime<Utc>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    /// Shutdown signal for the HTTP server
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!(
            "Initializing duel-arena service - name: {}, bind: {}",
            config.service.name,
            config.bind_address()
        );

        let catalog = StaticProblemCatalog::new(config.problems.catalog.clone()).map_err(|e| {
            ServiceError::Configuration {
                message: e.to_string(),
            }
        })?;
        info!(
            "Problem catalog loaded - {} problems available",
            config.problems.catalog.len()
        );

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let sink = Arc::new(ChannelEventSink::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(catalog),
            sink.clone(),
            metrics.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            dispatcher,
            sink,
            metrics,
            started_at: crate::utils::current_timestamp(),
            is_running: Arc::new(RwLock::new(false)),
            shutdown_tx,
        })
    }

    /// Serve the WebSocket and monitoring endpoints until shutdown
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address()
            .parse()
            .context("Invalid server bind address")?;

        let app = Self::create_router(self.clone());
        let listener = TcpListener::bind(addr).await?;

        {
            let mut running = self.is_running.write().await;
            *running = true;
        }

        info!("duel-arena listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Server shutdown signal received");
            })
            .await?;

        {
            let mut running = self.is_running.write().await;
            *running = false;
        }

        info!("Server stopped");
        Ok(())
    }

    /// Signal the server to shut down gracefully
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Create the axum router with all endpoints
    fn create_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/stats", get(stats_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Core event dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Outbound connection registry
    pub fn sink(&self) -> &Arc<ChannelEventSink> {
        &self.sink
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Service start time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the server loop is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/ws",
            "/health",
            "/stats",
            "/metrics"
        ]
    });

    Json(info)
}

/// Health check endpoint handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::check(&state).await {
        Ok(health) => {
            let code = if health.status == crate::service::health::HealthStatus::Healthy {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (code, Json(serde_json::to_value(health).unwrap_or_default()))
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
        }
    }
}

/// Dispatcher statistics endpoint handler
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.dispatcher().get_stats() {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "players_queued": stats.players_queued,
                "players_waiting": stats.players_waiting,
                "sessions_created": stats.sessions_created,
                "sessions_finished": stats.sessions_finished,
                "sessions_abandoned": stats.sessions_abandoned,
                "active_sessions": stats.active_sessions,
                "open_connections": state.sink().connection_count(),
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics().registry().gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_initialization() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert_eq!(state.dispatcher().waiting_count(), 0);
        assert_eq!(state.sink().connection_count(), 0);
    }

    #[test]
    fn test_app_state_rejects_empty_catalog() {
        let mut config = AppConfig::default();
        config.problems.catalog.clear();
        assert!(AppState::new(config).is_err());
    }
}
