//! Event transport for workflow observability.
//!
//! Nodes and the engine push [`Event`]s into an [`EventBus`], which fans
//! them out to registered [`EventSink`]s on a background task. The default
//! bus writes to stdout; tests attach a [`MemorySink`], streaming consumers
//! a [`ChannelSink`].

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, NodeEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink, WriterSink};
