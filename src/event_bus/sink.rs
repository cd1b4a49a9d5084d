use std::io::{self, Result as IoResult, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::event::Event;
use crate::telemetry::{PlainFormatter, TelemetryFormatter};

/// Abstraction over an output target that consumes full [`Event`] objects.
pub trait EventSink: Sync + Send {
    /// Handle a structured event. The sink decides how to format it.
    fn handle(&mut self, event: &Event) -> IoResult<()>;
}

/// Sink that renders events through a [`TelemetryFormatter`] and writes the
/// joined [`EventRender`](crate::telemetry::EventRender) lines to any
/// `Write` target: stdout, a log file, or a byte buffer in tests.
pub struct WriterSink<W: Write + Send + Sync, F: TelemetryFormatter = PlainFormatter> {
    target: W,
    formatter: F,
}

impl<W: Write + Send + Sync> WriterSink<W> {
    /// Writer sink with the default plain formatter (TTY-detected color).
    pub fn new(target: W) -> Self {
        Self {
            target,
            formatter: PlainFormatter::new(),
        }
    }
}

impl<W: Write + Send + Sync, F: TelemetryFormatter> WriterSink<W, F> {
    pub fn with_formatter(target: W, formatter: F) -> Self {
        Self { target, formatter }
    }
}

impl<W: Write + Send + Sync, F: TelemetryFormatter> EventSink for WriterSink<W, F> {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        let rendered = self.formatter.render_event(event);
        self.target.write_all(rendered.join_lines().as_bytes())?;
        self.target.flush()
    }
}

/// The default sink: rendered events on stdout.
pub type StdOutSink = WriterSink<io::Stdout>;

impl Default for StdOutSink {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}

/// In-memory sink for tests and snapshots, with accessors shaped around the
/// two event families the engine produces.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events so far.
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().unwrap().clone()
    }

    /// Captured events carrying the given scope label.
    pub fn scoped(&self, scope: &str) -> Vec<Event> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.scope_label() == scope)
            .cloned()
            .collect()
    }

    /// Messages of captured node events for one node id, in emission order.
    pub fn node_messages(&self, node_id: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Node(n) if n.node_id() == Some(node_id) => {
                    Some(n.message().to_string())
                }
                _ => None,
            })
            .collect()
    }

    /// Discard all captured events.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Sink that forwards events into a tokio mpsc channel for live consumers
/// (dashboards, log shippers) running alongside an invocation.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}
