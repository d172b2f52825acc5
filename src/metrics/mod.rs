//! Metrics collection using Prometheus

pub mod collector;

pub use collector::MetricsCollector;
