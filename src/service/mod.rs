//! Service coordination: application state, HTTP/WebSocket surface, health

pub mod app;
pub mod health;
pub mod ws;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
