//! Priority selection: which task should be worked on next.

use std::cmp::Reverse;

use super::table::TaskTable;
use crate::domain::{Task, TaskStatus};

impl TaskTable {
    /// Highest-priority task with `status`.
    ///
    /// Order: priority rank (high first), then `created` (oldest first),
    /// then id so the choice is deterministic.
    pub(crate) fn highest_priority(&self, status: TaskStatus) -> Option<&Task> {
        self.iter()
            .filter(|task| task.status == status)
            .min_by_key(|task| (Reverse(task.priority.rank()), task.created, task.id))
    }
}

#[cfg(test)]
mod tests {
    use super::super::table::fixtures::task;
    use super::*;
    use crate::domain::{NewTask, TaskPriority};
    use rstest::rstest;

    #[rstest]
    #[case::high_beats_others([TaskPriority::Low, TaskPriority::High, TaskPriority::Medium], 1)]
    #[case::medium_beats_low([TaskPriority::Low, TaskPriority::Medium, TaskPriority::Low], 1)]
    #[case::oldest_high_wins([TaskPriority::High, TaskPriority::Low, TaskPriority::High], 0)]
    #[case::all_equal_oldest_wins([TaskPriority::Medium, TaskPriority::Medium, TaskPriority::Medium], 0)]
    fn selects_by_rank_then_age(#[case] priorities: [TaskPriority; 3], #[case] expected: usize) {
        let mut table = TaskTable::new();
        let tasks: Vec<Task> = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| task(NewTask::new(format!("task {i}")).with_priority(*p), i as i64))
            .collect();
        // Insert newest first so HashMap order cannot accidentally match.
        for t in tasks.iter().rev() {
            table.insert(t.clone());
        }

        let picked = table.highest_priority(TaskStatus::Todo).unwrap();
        assert_eq!(picked.id, tasks[expected].id);
    }

    #[test]
    fn ignores_other_statuses() {
        let mut table = TaskTable::new();
        let done = task(
            NewTask::new("done high")
                .with_priority(TaskPriority::High)
                .with_status(TaskStatus::Done),
            0,
        );
        let todo = task(NewTask::new("todo low").with_priority(TaskPriority::Low), 1);
        table.insert(done);
        table.insert(todo.clone());

        assert_eq!(table.highest_priority(TaskStatus::Todo), Some(&todo));
        assert!(table.highest_priority(TaskStatus::Blocked).is_none());
    }
}
