use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task};

use super::event::Event;
use super::sink::{EventSink, StdOutSink};

/// Receives events from executing nodes and broadcasts them to sinks.
///
/// One bus serves one invocation (or as many as the caller wants to share
/// it across); producers hold cloned [`flume::Sender`]s obtained from
/// [`get_sender`](EventBus::get_sender).
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    event_channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create an EventBus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an EventBus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            event_channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink (useful for attaching a test capture or a
    /// per-invocation stream before execution starts).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side so producers can emit events.
    pub fn get_sender(&self) -> flume::Sender<Event> {
        self.event_channel.0.clone()
    }

    /// Spawn a background task that forwards events to all sinks.
    /// Idempotent: calling it again has no effect.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.event_channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                // Biased toward the receiver so a shutdown request only
                // takes effect once queued events are drained.
                tokio::select! {
                    biased;
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => {
                            let mut sinks_guard = sinks.lock().unwrap();
                            for sink in sinks_guard.iter_mut() {
                                if let Err(e) = sink.handle(&event) {
                                    tracing::warn!(error = %e, "event sink error");
                                }
                            }
                        }
                    },
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener after it drains queued events.
    pub async fn stop_listener(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
