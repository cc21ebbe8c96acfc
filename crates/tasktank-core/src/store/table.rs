//! Task table: the authoritative in-memory map.
//!
//! Design:
//! - This is the "single source of truth" for task state.
//! - The persistence layer only ever sees clones taken from here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskId, TaskPriority, TaskStatus};

/// Optional status/priority filter for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            priority: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskTable {
    tasks: HashMap<TaskId, Task>,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Insert or replace by id.
    pub(crate) fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id, task)
    }

    pub(crate) fn remove(&mut self, id: &TaskId) -> Option<Task> {
        self.tasks.remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Clone every task out (order is not meaningful).
    pub(crate) fn snapshot(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub(crate) fn filter(&self, filter: &TaskFilter) -> Vec<Task> {
        self.iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::task;
    use super::*;
    use crate::domain::NewTask;

    #[test]
    fn filter_combines_status_and_priority() {
        let mut table = TaskTable::new();
        let a = task(NewTask::new("alpha").with_priority(TaskPriority::High), 0);
        let b = task(NewTask::new("beta").with_priority(TaskPriority::Low), 1);
        let c = task(
            NewTask::new("gamma")
                .with_priority(TaskPriority::High)
                .with_status(TaskStatus::Done),
            2,
        );
        for t in [&a, &b, &c] {
            table.insert(t.clone());
        }

        let all = table.filter(&TaskFilter::default());
        assert_eq!(all.len(), 3);

        let high_todo = table.filter(&TaskFilter {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::High),
        });
        assert_eq!(high_todo, vec![a]);

        let done = table.filter(&TaskFilter::status(TaskStatus::Done));
        assert_eq!(done, vec![c]);
        assert!(table.filter(&TaskFilter::status(TaskStatus::Blocked)).is_empty());
    }

    #[test]
    fn insert_replaces_by_id() {
        let mut table = TaskTable::new();
        let original = task(NewTask::new("alpha"), 0);
        let mut changed = original.clone();
        changed.description = "alpha two".to_string();

        assert!(table.insert(original.clone()).is_none());
        assert_eq!(table.insert(changed.clone()), Some(original));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&changed.id), Some(&changed));
    }
}
