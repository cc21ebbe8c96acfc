//! Dependency queries over the `dependsOn` relation.
//!
//! Design:
//! - Forward edges live on each task (`depends_on`): task -> tasks it waits for.
//! - Reverse edges are not indexed; "who depends on X" is a linear scan.
//!   The table is process-local and small, so O(n) is fine here.
//! - One hop only. Cycles are allowed and never followed.

use std::collections::HashSet;

use super::table::TaskTable;
use crate::domain::{Task, TaskId};

impl TaskTable {
    /// Tasks that `id` depends on and that exist in the table.
    ///
    /// Dangling references are dropped silently.
    pub(crate) fn dependencies(&self, id: &TaskId) -> Vec<Task> {
        self.get(id)
            .map(|task| {
                task.depends_on
                    .iter()
                    .filter_map(|dep| self.get(dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tasks whose `depends_on` contains `id`, oldest first.
    pub(crate) fn dependents(&self, id: &TaskId) -> Vec<Task> {
        let mut dependents: Vec<Task> = self
            .iter()
            .filter(|task| task.depends_on(id))
            .cloned()
            .collect();
        dependents.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        dependents
    }

    /// Deduplicated union of `dependencies(id)` and `dependents(id)`.
    ///
    /// An unknown `id` has no related tasks.
    pub(crate) fn related(&self, id: &TaskId) -> Vec<Task> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.dependencies(id)
            .into_iter()
            .chain(self.dependents(id))
            .filter(|task| seen.insert(task.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::table::fixtures::task;
    use super::*;
    use crate::domain::NewTask;
    use uuid::Uuid;

    fn ids(tasks: &[Task]) -> Vec<TaskId> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn related_is_symmetric_for_a_single_edge() {
        let mut table = TaskTable::new();
        let b = task(NewTask::new("task b"), 0);
        let a = task(NewTask::new("task a").depending_on(b.id), 1);
        table.insert(a.clone());
        table.insert(b.clone());

        assert_eq!(ids(&table.related(&a.id)), vec![b.id]);
        assert_eq!(ids(&table.related(&b.id)), vec![a.id]);
    }

    #[test]
    fn dangling_references_are_dropped() {
        let mut table = TaskTable::new();
        let ghost = TaskId::from_uuid(Uuid::new_v4());
        let a = task(NewTask::new("task a").depending_on(ghost), 0);
        table.insert(a.clone());

        assert!(table.dependencies(&a.id).is_empty());
        assert!(table.related(&a.id).is_empty());
    }

    #[test]
    fn mutual_dependency_is_reported_once() {
        let mut table = TaskTable::new();
        let mut a = task(NewTask::new("task a"), 0);
        let b = task(NewTask::new("task b").depending_on(a.id), 1);
        a.depends_on.insert(b.id);
        table.insert(a.clone());
        table.insert(b.clone());

        // A -> B -> A (cycle): B is both a dependency and a dependent of A.
        assert_eq!(ids(&table.related(&a.id)), vec![b.id]);
    }

    #[test]
    fn query_is_one_hop_only() {
        let mut table = TaskTable::new();
        let c = task(NewTask::new("task c"), 0);
        let b = task(NewTask::new("task b").depending_on(c.id), 1);
        let a = task(NewTask::new("task a").depending_on(b.id), 2);
        for t in [&a, &b, &c] {
            table.insert(t.clone());
        }

        // A -> B -> C: C is two hops from A.
        assert_eq!(ids(&table.related(&a.id)), vec![b.id]);
        let mut around_b = ids(&table.related(&b.id));
        around_b.sort();
        let mut expected = vec![a.id, c.id];
        expected.sort();
        assert_eq!(around_b, expected);
    }

    #[test]
    fn dependents_are_oldest_first() {
        let mut table = TaskTable::new();
        let root = task(NewTask::new("root task"), 0);
        let late = task(NewTask::new("late dependent").depending_on(root.id), 20);
        let early = task(NewTask::new("early dependent").depending_on(root.id), 10);
        for t in [&root, &late, &early] {
            table.insert(t.clone());
        }

        assert_eq!(ids(&table.dependents(&root.id)), vec![early.id, late.id]);
    }

    #[test]
    fn unknown_id_has_no_related_tasks() {
        let mut table = TaskTable::new();
        let ghost = TaskId::from_uuid(Uuid::new_v4());
        table.insert(task(NewTask::new("task a").depending_on(ghost), 0));

        assert!(table.related(&ghost).is_empty());
    }
}
