//! Error types for the duel service
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the application. The dispatcher deliberately keeps
//! the taxonomy shallow: most triggering events are fire-and-forget, so
//! unknown sessions and absent connections resolve as silent no-ops rather
//! than errors.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific duel-service scenarios
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("Connection send failed: {connection_id}")]
    SendFailed { connection_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
