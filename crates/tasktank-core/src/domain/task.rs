//! Task entity: schema, defaults, and construction/update rules.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ValidationError, ValidationRule};
use super::ids::TaskId;

/// Minimum description length, counted in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 3;

/// Task status.
///
/// Any status may move to any other; the store does not enforce a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    const NAMES: &'static [&'static str] = &["todo", "in-progress", "blocked", "done"];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::new("status", ValidationRule::OneOf(Self::NAMES), s))
    }
}

/// Task priority. Ordering follows rank: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    const NAMES: &'static [&'static str] = &["low", "medium", "high"];

    /// Scheduling rank: high=3, medium=2, low=1.
    pub fn rank(self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| ValidationError::new("priority", ValidationRule::OneOf(Self::NAMES), s))
    }
}

/// A unit of work.
///
/// Design:
/// - Built only by `Task::create` (store `add`) and replaced only by `Task::apply`.
/// - `id` and `created` never change once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
}

/// Typed input for creating a task. Everything except `description` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
    pub depends_on: BTreeSet<TaskId>,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn depending_on(mut self, id: TaskId) -> Self {
        self.depends_on.insert(id);
        self
    }
}

/// Partial update. `None` leaves the field untouched; `id` is not patchable.
///
/// `due` is doubly optional: `Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due: Option<Option<DateTime<Utc>>>,
    pub tags: Option<BTreeSet<String>>,
    pub depends_on: Option<BTreeSet<TaskId>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(ValidationError::new(
            "description",
            ValidationRule::MinLength(MIN_DESCRIPTION_CHARS),
            description,
        ));
    }
    Ok(())
}

impl Task {
    /// Build a fully-populated task, applying defaults.
    pub fn create(input: NewTask, id: TaskId, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        validate_description(&input.description)?;
        Ok(Self {
            id,
            description: input.description,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            created: now,
            updated: now,
            due: input.due,
            tags: input.tags,
            depends_on: input.depends_on,
        })
    }

    /// Return a new task with `patch` merged in and `updated` refreshed.
    ///
    /// Only touched fields are re-validated. `updated` never moves backwards,
    /// even if the clock does.
    pub fn apply(&self, patch: TaskPatch, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }

        let mut next = self.clone();
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(due) = patch.due {
            next.due = due;
        }
        if let Some(tags) = patch.tags {
            next.tags = tags;
        }
        if let Some(depends_on) = patch.depends_on {
            next.depends_on = depends_on;
        }
        next.updated = now.max(self.updated);
        Ok(next)
    }

    /// Check a record that did not come through `create` (e.g. read from disk).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_description(&self.description)
    }

    pub fn depends_on(&self, id: &TaskId) -> bool {
        self.depends_on.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use uuid::Uuid;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn new_id() -> TaskId {
        TaskId::from_uuid(Uuid::new_v4())
    }

    #[test]
    fn create_applies_defaults() {
        let task = Task::create(NewTask::new("Write spec"), new_id(), at(0)).unwrap();

        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created, at(0));
        assert_eq!(task.updated, at(0));
        assert!(task.due.is_none());
        assert!(task.tags.is_empty());
        assert!(task.depends_on.is_empty());
    }

    #[rstest]
    #[case("", false)]
    #[case("ab", false)]
    #[case("abc", true)]
    #[case("日本語", true)]
    #[case("日本", false)]
    fn description_needs_three_characters(#[case] description: &str, #[case] ok: bool) {
        let result = Task::create(NewTask::new(description), new_id(), at(0));
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert_eq!(err.field, "description");
            assert_eq!(err.rule, ValidationRule::MinLength(3));
        }
    }

    #[test]
    fn empty_patch_only_touches_updated() {
        let task = Task::create(
            NewTask::new("Write spec").with_tag("docs").with_priority(TaskPriority::High),
            new_id(),
            at(0),
        )
        .unwrap();

        let patched = task.apply(TaskPatch::default(), at(5)).unwrap();

        assert_eq!(patched.updated, at(5));
        let mut expected = task.clone();
        expected.updated = at(5);
        assert_eq!(patched, expected);
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let task = Task::create(NewTask::new("Write spec"), new_id(), at(0)).unwrap();
        let before = task.clone();

        let patched = task.apply(TaskPatch::status(TaskStatus::Done), at(1)).unwrap();

        assert_eq!(task, before);
        assert_eq!(patched.status, TaskStatus::Done);
        assert_eq!(patched.id, task.id);
        assert_eq!(patched.created, task.created);
    }

    #[test]
    fn apply_rejects_short_description_and_keeps_task() {
        let task = Task::create(NewTask::new("Write spec"), new_id(), at(0)).unwrap();
        let patch = TaskPatch {
            description: Some("no".to_string()),
            ..TaskPatch::default()
        };

        let err = task.apply(patch, at(1)).unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn updated_never_moves_backwards() {
        let task = Task::create(NewTask::new("Write spec"), new_id(), at(10)).unwrap();

        let patched = task.apply(TaskPatch::status(TaskStatus::Blocked), at(3)).unwrap();

        assert_eq!(patched.updated, at(10));
    }

    #[rstest]
    #[case("todo", TaskStatus::Todo)]
    #[case("in-progress", TaskStatus::InProgress)]
    #[case("blocked", TaskStatus::Blocked)]
    #[case("done", TaskStatus::Done)]
    fn status_parses_wire_names(#[case] raw: &str, #[case] expected: TaskStatus) {
        assert_eq!(raw.parse::<TaskStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let err = "in_progress".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.field, "status");
        let err = "urgent".parse::<TaskPriority>().unwrap_err();
        assert_eq!(err.field, "priority");
        assert_eq!(err.rule, ValidationRule::OneOf(&["low", "medium", "high"]));
    }

    #[rstest]
    #[case(" todo")]
    #[case("todo ")]
    #[case("Todo")]
    #[case("")]
    fn status_requires_exact_wire_name(#[case] raw: &str) {
        let err = raw.parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.value, raw);
    }

    #[test]
    fn priority_requires_exact_wire_name() {
        assert!(" high ".parse::<TaskPriority>().is_err());
        assert!("HIGH".parse::<TaskPriority>().is_err());
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
    }

    #[test]
    fn patch_can_set_and_clear_due() {
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let task = Task::create(NewTask::new("Write spec").with_due(due), new_id(), at(0)).unwrap();

        let untouched = task.apply(TaskPatch::default(), at(1)).unwrap();
        assert_eq!(untouched.due, Some(due));

        let moved = task
            .apply(
                TaskPatch {
                    due: Some(Some(at(60))),
                    ..TaskPatch::default()
                },
                at(1),
            )
            .unwrap();
        assert_eq!(moved.due, Some(at(60)));

        let cleared = task
            .apply(
                TaskPatch {
                    due: Some(None),
                    ..TaskPatch::default()
                },
                at(1),
            )
            .unwrap();
        assert_eq!(cleared.due, None);
    }

    #[test]
    fn priority_ranks_follow_ordering() {
        assert_eq!(TaskPriority::High.rank(), 3);
        assert_eq!(TaskPriority::Medium.rank(), 2);
        assert_eq!(TaskPriority::Low.rank(), 1);
        assert!(TaskPriority::Low < TaskPriority::High);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let dep = new_id();
        let task = Task::create(
            NewTask::new("Write spec")
                .with_status(TaskStatus::InProgress)
                .depending_on(dep),
            new_id(),
            at(0),
        )
        .unwrap();

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["dependsOn"][0], dep.to_string());
        assert!(json.get("due").is_none());
        assert_eq!(json["tags"], serde_json::json!([]));
    }
}
