//! Task store: the authoritative table plus its persistence, events and timers.
//!
//! `TaskStore` is a cheap `Clone` handle (`Arc` inside). Construct it through
//! [`StoreBuilder`](crate::app::StoreBuilder), then call [`TaskStore::load`]
//! once; every mutation before that fails with `NotReady`.
//!
//! Locking:
//! - The table sits behind one `tokio::sync::Mutex`, held for the whole
//!   read-modify-write of each operation.
//! - Events are emitted while the lock is held, so subscribers see them in
//!   mutation order.
//! - Writes to the mirror are serialized by a second lock; the snapshot is
//!   taken under it, so an older snapshot never lands after a newer one.

mod dependency;
mod scheduler;
mod table;
mod throttle;
mod timers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

pub use self::table::TaskFilter;
pub use self::throttle::DEFAULT_SAVE_THROTTLE;

use self::table::TaskTable;
use self::throttle::SaveThrottle;
use self::timers::AutoTransitions;
use crate::domain::{
    NewTask, PersistenceError, Task, TaskEvent, TaskId, TaskPatch, TaskStatus, TaskStoreError,
};
use crate::impls::BroadcastEventSink;
use crate::ports::{Clock, EventSink, IdGenerator, SnapshotStore};

/// What `load` found on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub created: bool,
}

/// Everything the builder hands over.
pub(crate) struct StoreParts {
    pub(crate) persistence: Arc<dyn SnapshotStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) sinks: Vec<Arc<dyn EventSink>>,
    pub(crate) save_throttle: Duration,
    pub(crate) event_capacity: usize,
}

struct StoreInner {
    table: Mutex<TaskTable>,
    ready: AtomicBool,
    closed: AtomicBool,
    write_lock: Mutex<()>,
    persistence: Arc<dyn SnapshotStore>,
    throttle: Arc<SaveThrottle>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    sinks: Vec<Arc<dyn EventSink>>,
    broadcast: BroadcastEventSink,
    timers: AutoTransitions,
}

impl StoreInner {
    fn emit(&self, event: TaskEvent) {
        for sink in &self.sinks {
            sink.emit(&event);
        }
        self.broadcast.emit(&event);
    }

    fn ensure_ready(&self) -> Result<(), TaskStoreError> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TaskStoreError::NotReady)
        }
    }

    async fn flush(&self) -> Result<usize, PersistenceError> {
        let _write = self.write_lock.lock().await;
        let snapshot = self.table.lock().await.snapshot();
        let count = snapshot.len();
        self.persistence.write(snapshot).await?;
        Ok(count)
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.throttle.close();
    }
}

/// Background writer: one per loaded store.
async fn run_writer(throttle: Arc<SaveThrottle>, store: Weak<StoreInner>) {
    while throttle.wait_due().await {
        let Some(inner) = store.upgrade() else {
            break;
        };
        match inner.flush().await {
            Ok(count) => debug!(count, location = %inner.persistence.location(), "throttled save"),
            Err(err) => error!(error = %err, "throttled save failed; in-memory state kept"),
        }
    }
    debug!("save writer stopped");
}

#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("location", &self.inner.persistence.location())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    pub(crate) fn from_parts(parts: StoreParts) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                table: Mutex::new(TaskTable::new()),
                ready: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                write_lock: Mutex::new(()),
                persistence: parts.persistence,
                throttle: Arc::new(SaveThrottle::new(parts.save_throttle)),
                clock: parts.clock,
                ids: parts.ids,
                sinks: parts.sinks,
                broadcast: BroadcastEventSink::new(parts.event_capacity),
                timers: AutoTransitions::new(),
            }),
        }
    }

    // ---- lifecycle ----

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Where the mirror lives, for logs and CLI output.
    pub fn location(&self) -> String {
        self.inner.persistence.location()
    }

    /// Read the mirror into memory and start the save writer.
    ///
    /// Calling it again on a ready store is a no-op. On an I/O error the store
    /// stays not ready and the call may be retried.
    pub async fn load(&self) -> Result<LoadSummary, TaskStoreError> {
        let mut table = self.inner.table.lock().await;
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(TaskStoreError::NotReady);
        }
        if self.is_ready() {
            return Ok(LoadSummary {
                loaded: table.len(),
                ..LoadSummary::default()
            });
        }

        let report = self.inner.persistence.load().await?;
        let summary = LoadSummary {
            loaded: report.tasks.len(),
            skipped: report.skipped,
            created: report.created,
        };
        for task in report.tasks {
            table.insert(task);
        }
        self.inner.ready.store(true, Ordering::Release);
        drop(table);

        tokio::spawn(run_writer(
            Arc::clone(&self.inner.throttle),
            Arc::downgrade(&self.inner),
        ));
        info!(
            location = %self.location(),
            loaded = summary.loaded,
            skipped = summary.skipped,
            "task store ready"
        );
        Ok(summary)
    }

    /// Cancel timers, stop the writer and flush the table one last time.
    ///
    /// The store rejects mutations afterwards.
    pub async fn shutdown(&self) -> Result<(), TaskStoreError> {
        let cleared = self.inner.timers.clear_all();
        let was_ready = {
            let _table = self.inner.table.lock().await;
            self.inner.closed.store(true, Ordering::Release);
            self.inner.ready.swap(false, Ordering::AcqRel)
        };
        self.inner.throttle.close();
        if was_ready {
            let count = self.inner.flush().await?;
            info!(count, cleared_timers = cleared, "task store shut down");
        }
        Ok(())
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.broadcast.subscribe()
    }

    // ---- persistence ----

    /// Request a throttled save.
    pub fn save(&self) -> Result<(), TaskStoreError> {
        self.inner.ensure_ready()?;
        self.inner.throttle.request();
        Ok(())
    }

    /// Write the whole table now, dropping any pending throttled save.
    pub async fn save_immediately(&self) -> Result<(), TaskStoreError> {
        self.inner.ensure_ready()?;
        self.inner.throttle.cancel_pending();
        let count = self.inner.flush().await?;
        info!(count, location = %self.location(), "saved tasks");
        Ok(())
    }

    // ---- CRUD ----

    pub async fn add(&self, input: NewTask) -> Result<Task, TaskStoreError> {
        let task = {
            let mut table = self.inner.table.lock().await;
            self.inner.ensure_ready()?;
            let mut id = self.inner.ids.generate_task_id();
            while table.contains(&id) {
                warn!(task_id = %id, "generated id already in use; retrying");
                id = self.inner.ids.generate_task_id();
            }
            let task = Task::create(input, id, self.inner.clock.now())?;
            table.insert(task.clone());
            self.inner.emit(TaskEvent::Added(task.clone()));
            task
        };
        self.inner.throttle.request();
        debug!(task_id = %task.id, "task added");
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.inner.table.lock().await.get(&id).cloned()
    }

    /// Every task, oldest first.
    pub async fn get_all(&self) -> Vec<Task> {
        self.list(TaskFilter::default()).await
    }

    pub async fn len(&self) -> usize {
        self.inner.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Merge `patch` into the task. `Ok(None)` when `id` is absent.
    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Option<Task>, TaskStoreError> {
        let updated = {
            let mut table = self.inner.table.lock().await;
            self.inner.ensure_ready()?;
            let Some(current) = table.get(&id) else {
                return Ok(None);
            };
            let next = current.apply(patch, self.inner.clock.now())?;
            table.insert(next.clone());
            self.inner.emit(TaskEvent::Updated(next.clone()));
            next
        };
        self.inner.throttle.request();
        debug!(task_id = %id, status = %updated.status, "task updated");
        Ok(Some(updated))
    }

    /// Remove the task and cancel its pending transition. False when absent.
    pub async fn delete(&self, id: TaskId) -> Result<bool, TaskStoreError> {
        {
            let mut table = self.inner.table.lock().await;
            self.inner.ensure_ready()?;
            if table.remove(&id).is_none() {
                return Ok(false);
            }
            self.inner.emit(TaskEvent::Deleted(id));
        }
        if self.inner.timers.clear(id) {
            debug!(task_id = %id, "cancelled auto-transition of deleted task");
        }
        self.inner.throttle.request();
        debug!(task_id = %id, "task deleted");
        Ok(true)
    }

    pub async fn get_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.list(TaskFilter::status(status)).await
    }

    /// Tasks matching `filter`, oldest first.
    pub async fn list(&self, filter: TaskFilter) -> Vec<Task> {
        let mut tasks = self.inner.table.lock().await.filter(&filter);
        sort_by_age(&mut tasks);
        tasks
    }

    // ---- dependency queries ----

    /// Tasks `id` depends on plus tasks depending on `id` (one hop, deduplicated).
    pub async fn get_related_tasks(&self, id: TaskId) -> Vec<Task> {
        self.inner.table.lock().await.related(&id)
    }

    pub async fn get_dependencies(&self, id: TaskId) -> Vec<Task> {
        self.inner.table.lock().await.dependencies(&id)
    }

    pub async fn get_dependents(&self, id: TaskId) -> Vec<Task> {
        self.inner.table.lock().await.dependents(&id)
    }

    // ---- scheduling ----

    /// Read-only pick of the next task with `status`.
    pub async fn get_highest_priority(&self, status: TaskStatus) -> Option<Task> {
        self.inner.table.lock().await.highest_priority(status).cloned()
    }

    /// Pick the next task with status `from` and move it to `to` in one step.
    ///
    /// Concurrent callers never receive the same task.
    pub async fn claim_highest_priority(
        &self,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Option<Task>, TaskStoreError> {
        let claimed = {
            let mut table = self.inner.table.lock().await;
            self.inner.ensure_ready()?;
            let Some(candidate) = table.highest_priority(from) else {
                return Ok(None);
            };
            let next = candidate.apply(TaskPatch::status(to), self.inner.clock.now())?;
            table.insert(next.clone());
            self.inner.emit(TaskEvent::Updated(next.clone()));
            next
        };
        self.inner.throttle.request();
        debug!(task_id = %claimed.id, from = %from, to = %to, "task claimed");
        Ok(Some(claimed))
    }

    // ---- auto-transitions ----

    /// Move `id` to `target` after `delay`, replacing any pending transition.
    pub async fn set_auto_transition(
        &self,
        id: TaskId,
        delay: Duration,
        target: TaskStatus,
    ) -> Result<(), TaskStoreError> {
        {
            let table = self.inner.table.lock().await;
            self.inner.ensure_ready()?;
            if !table.contains(&id) {
                return Err(TaskStoreError::NotFound(id));
            }
        }

        let store = Arc::downgrade(&self.inner);
        self.inner.timers.schedule(id, move |ticket| {
            tokio::spawn(fire_transition(store, id, ticket, delay, target))
        });
        debug!(task_id = %id, delay_ms = delay.as_millis() as u64, target = %target, "auto-transition scheduled");
        Ok(())
    }

    /// Cancel the pending transition for `id`. True if one was pending.
    pub fn clear_timeout(&self, id: TaskId) -> bool {
        self.inner.timers.clear(id)
    }

    /// Cancel every pending transition. Returns how many were pending.
    pub fn clear_all_timeouts(&self) -> usize {
        self.inner.timers.clear_all()
    }

    pub fn pending_transitions(&self) -> usize {
        self.inner.timers.pending_ids().len()
    }

    pub fn pending_transition_ids(&self) -> Vec<TaskId> {
        self.inner.timers.pending_ids()
    }
}

async fn fire_transition(
    store: Weak<StoreInner>,
    id: TaskId,
    ticket: u64,
    delay: Duration,
    target: TaskStatus,
) {
    tokio::time::sleep(delay).await;
    let Some(inner) = store.upgrade() else {
        return;
    };
    if !inner.timers.take(id, ticket) {
        return;
    }
    let store = TaskStore { inner };
    match store.update(id, TaskPatch::status(target)).await {
        Ok(Some(_)) => debug!(task_id = %id, target = %target, "auto-transition fired"),
        Ok(None) => debug!(task_id = %id, "auto-transition target no longer exists"),
        Err(err) => warn!(task_id = %id, error = %err, "auto-transition failed"),
    }
}

fn sort_by_age(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
}
