//! Auto-transition timers.
//!
//! At most one pending transition per task: scheduling again replaces
//! (and aborts) the earlier one. Each timer carries a ticket so a timer that
//! was replaced while already firing cannot apply its stale transition.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;

use crate::domain::TaskId;

#[derive(Debug)]
struct PendingTransition {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub(crate) struct AutoTransitions {
    pending: Mutex<HashMap<TaskId, PendingTransition>>,
    next_ticket: AtomicU64,
}

impl AutoTransitions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_pending<R>(&self, f: impl FnOnce(&mut HashMap<TaskId, PendingTransition>) -> R) -> R {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut pending)
    }

    /// Register a timer for `id`, replacing any earlier one.
    ///
    /// `spawn` receives the ticket the timer must present to `take`.
    /// Registration happens under the map lock, so a zero-delay timer still
    /// finds its own entry.
    pub(crate) fn schedule(&self, id: TaskId, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.with_pending(|pending| {
            if let Some(previous) = pending.remove(&id) {
                previous.handle.abort();
            }
            let handle = spawn(ticket);
            pending.insert(id, PendingTransition { ticket, handle });
        });
    }

    /// Claim the right to fire. False if the timer was cleared or replaced.
    pub(crate) fn take(&self, id: TaskId, ticket: u64) -> bool {
        self.with_pending(|pending| match pending.get(&id) {
            Some(entry) if entry.ticket == ticket => {
                pending.remove(&id);
                true
            }
            _ => false,
        })
    }

    /// Cancel the timer for `id`. Returns true if one was pending.
    pub(crate) fn clear(&self, id: TaskId) -> bool {
        self.with_pending(|pending| match pending.remove(&id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        })
    }

    /// Cancel every timer. Returns how many were pending.
    pub(crate) fn clear_all(&self) -> usize {
        self.with_pending(|pending| {
            let count = pending.len();
            for (_, entry) in pending.drain() {
                entry.handle.abort();
            }
            count
        })
    }

    pub(crate) fn pending_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.with_pending(|pending| pending.keys().copied().collect());
        ids.sort();
        ids
    }
}

impl Drop for AutoTransitions {
    fn drop(&mut self) {
        self.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use uuid::Uuid;

    fn spawn_counter(
        timers: &Arc<AutoTransitions>,
        fired: &Arc<AtomicUsize>,
        id: TaskId,
        delay: Duration,
    ) {
        let timers_for_task = Arc::clone(timers);
        let fired = Arc::clone(fired);
        timers.schedule(id, move |ticket| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if timers_for_task.take(id, ticket) {
                    fired.fetch_add(1, Ordering::SeqCst);
                }
            })
        });
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_earlier_timer() {
        let timers = Arc::new(AutoTransitions::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let id = TaskId::from_uuid(Uuid::new_v4());

        spawn_counter(&timers, &fired, id, Duration::from_millis(20));
        spawn_counter(&timers, &fired, id, Duration::from_millis(40));
        assert_eq!(timers.pending_ids(), vec![id]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timers.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn cleared_timer_never_fires() {
        let timers = Arc::new(AutoTransitions::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let a = TaskId::from_uuid(Uuid::new_v4());
        let b = TaskId::from_uuid(Uuid::new_v4());

        spawn_counter(&timers, &fired, a, Duration::from_millis(20));
        spawn_counter(&timers, &fired, b, Duration::from_millis(20));
        assert!(timers.clear(a));
        assert!(!timers.clear(a));
        assert_eq!(timers.clear_all(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let timers = AutoTransitions::new();
        let id = TaskId::from_uuid(Uuid::new_v4());
        assert!(!timers.take(id, 7));
    }
}
