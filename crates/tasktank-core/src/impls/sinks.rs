//! EventSink implementations.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::TaskEvent;
use crate::ports::EventSink;

/// Fans events out to any number of `broadcast::Receiver`s.
///
/// Slow receivers lag (and see `RecvError::Lagged`) instead of blocking the store.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<TaskEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: &TaskEvent) {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(event.clone());
    }
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &TaskEvent) {
        debug!(event = event.name(), task_id = %event.task_id(), "task event");
    }
}
