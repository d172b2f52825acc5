//! Duel Arena - Real-time matchmaking for head-to-head coding battles
//!
//! This crate pairs waiting participants into timed two-player duel
//! sessions over WebSocket connections, tracks each session's lifecycle,
//! and broadcasts lifecycle events to both participants.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod problem;
pub mod queue;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{DuelError, Result};
pub use types::*;

// Re-export key components
pub use dispatch::{Dispatcher, EventSink};
pub use queue::MatchmakingQueue;
pub use session::SessionRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
