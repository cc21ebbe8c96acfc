//! Events - ドメインイベント
//!
//! ストアの変更ごとに 1 件発行され、`EventSink` と `subscribe()` の購読者に届きます。

use serde::Serialize;

use super::ids::TaskId;
use super::task::Task;

/// A change to the task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum TaskEvent {
    #[serde(rename = "task-added")]
    Added(Task),
    #[serde(rename = "task-updated")]
    Updated(Task),
    #[serde(rename = "task-deleted")]
    Deleted(TaskId),
}

impl TaskEvent {
    /// Event name (`task-added`, `task-updated`, `task-deleted`).
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Added(_) => "task-added",
            TaskEvent::Updated(_) => "task-updated",
            TaskEvent::Deleted(_) => "task-deleted",
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Added(task) | TaskEvent::Updated(task) => task.id,
            TaskEvent::Deleted(id) => *id,
        }
    }
}
