//! Duel session state and lifecycle management

pub mod instance;
pub mod registry;

pub use instance::{FinishedSession, Session, SessionStatus};
pub use registry::SessionRegistry;
