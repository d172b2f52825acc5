//! Configuration management for the duel service

pub mod app;

pub use app::{AppConfig, ProblemSettings, ServerSettings, ServiceSettings};
