//! Save throttle: coalesces bursts of save requests into one write.
//!
//! The first request after a write opens a window; every request that arrives
//! before the window closes rides along with it. A steady stream of
//! mutations therefore still reaches disk once per window, and unsaved state
//! is never older than one window. A single background writer waits for the
//! deadline, so at most one write is in flight.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Default window between the first unsaved change and its write.
pub const DEFAULT_SAVE_THROTTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Default)]
struct ThrottleState {
    deadline: Option<Instant>,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct SaveThrottle {
    window: Duration,
    state: Mutex<ThrottleState>,
    notify: Notify,
}

impl SaveThrottle {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(ThrottleState::default()),
            notify: Notify::new(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ThrottleState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Mark a save as pending. Only the first request of a window sets the deadline.
    pub(crate) fn request(&self) {
        let window = self.window;
        let accepted = self.with_state(|state| {
            if state.closed {
                return false;
            }
            state.deadline.get_or_insert_with(|| Instant::now() + window);
            true
        });
        if accepted {
            self.notify.notify_one();
        }
    }

    /// Drop a pending request. Returns true if one was pending.
    pub(crate) fn cancel_pending(&self) -> bool {
        self.with_state(|state| state.deadline.take().is_some())
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.with_state(|state| state.deadline.is_some())
    }

    /// Stop the writer. Pending requests are discarded; flush first if needed.
    pub(crate) fn close(&self) {
        self.with_state(|state| {
            state.closed = true;
            state.deadline = None;
        });
        self.notify.notify_one();
    }

    /// Wait until a pending save is due and claim it.
    ///
    /// Returns false once the throttle is closed.
    pub(crate) async fn wait_due(&self) -> bool {
        loop {
            let now = Instant::now();
            let step = self.with_state(|state| {
                if state.closed {
                    return Step::Closed;
                }
                match state.deadline {
                    None => Step::Idle,
                    Some(deadline) if deadline <= now => {
                        state.deadline = None;
                        Step::Due
                    }
                    Some(deadline) => Step::Sleep(deadline),
                }
            });

            match step {
                Step::Closed => return false,
                Step::Due => return true,
                Step::Idle => self.notify.notified().await,
                Step::Sleep(deadline) => {
                    // Requests wake us too; they never move the deadline, so re-check and sleep on.
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = self.notify.notified() => {}
                    }
                }
            }
        }
    }
}

enum Step {
    Closed,
    Idle,
    Due,
    Sleep(Instant),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn burst_within_a_window_is_due_once() {
        let throttle = SaveThrottle::new(Duration::from_millis(40));
        let started = Instant::now();
        for _ in 0..3 {
            throttle.request();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(throttle.wait_due().await);
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(!throttle.is_pending());
    }

    #[tokio::test]
    async fn sustained_requests_do_not_postpone_the_write() {
        let throttle = Arc::new(SaveThrottle::new(Duration::from_millis(30)));
        let feeder = {
            let throttle = Arc::clone(&throttle);
            tokio::spawn(async move {
                for _ in 0..60 {
                    throttle.request();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        };

        let first = tokio::time::timeout(Duration::from_millis(200), throttle.wait_due()).await;
        assert_eq!(first.ok(), Some(true));
        let second = tokio::time::timeout(Duration::from_millis(200), throttle.wait_due()).await;
        assert_eq!(second.ok(), Some(true));
        feeder.abort();
    }

    #[tokio::test]
    async fn cancel_clears_pending_request() {
        let throttle = SaveThrottle::new(Duration::from_millis(20));
        throttle.request();
        assert!(throttle.is_pending());
        assert!(throttle.cancel_pending());
        assert!(!throttle.cancel_pending());
    }

    #[tokio::test]
    async fn close_wakes_an_idle_waiter() {
        let throttle = Arc::new(SaveThrottle::new(Duration::from_millis(20)));
        let waiter = {
            let throttle = Arc::clone(&throttle);
            tokio::spawn(async move { throttle.wait_due().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttle.close();

        assert!(!waiter.await.unwrap());
        throttle.request();
        assert!(!throttle.is_pending());
    }
}
