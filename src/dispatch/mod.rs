//! Connection dispatching: inbound event routing and outbound fan-out

pub mod dispatcher;
pub mod sink;

pub use dispatcher::{Dispatcher, DispatcherStats};
pub use sink::{ChannelEventSink, EventSink, RecordingEventSink};
