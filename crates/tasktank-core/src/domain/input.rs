//! Wire input - 呼び出し側から届く未検証の入力
//!
//! The tool layer receives strings. Converting them into `NewTask` / `TaskPatch`
//! is where enum, id and timestamp rules are checked.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::{ValidationError, ValidationRule};
use super::ids::TaskId;
use super::task::{NewTask, TaskPatch, TaskPriority, TaskStatus, validate_description};

/// Untyped create request as it arrives over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskInput {
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
}

/// Untyped patch as it arrives over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatchInput {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Absent: keep. `null`: clear. String: set.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub due: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
}

/// Keeps an explicit `null` distinguishable from a missing field.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ValidationError::new(field, ValidationRule::Timestamp, raw))
}

pub fn parse_task_id(field: &'static str, raw: &str) -> Result<TaskId, ValidationError> {
    TaskId::parse(raw).map_err(|_| ValidationError::new(field, ValidationRule::TaskId, raw))
}

fn parse_depends_on(raw: Vec<String>) -> Result<BTreeSet<TaskId>, ValidationError> {
    raw.iter()
        .map(|id| parse_task_id("dependsOn", id))
        .collect()
}

impl TryFrom<NewTaskInput> for NewTask {
    type Error = ValidationError;

    fn try_from(input: NewTaskInput) -> Result<Self, Self::Error> {
        validate_description(&input.description)?;
        Ok(NewTask {
            status: input
                .status
                .as_deref()
                .map(str::parse::<TaskStatus>)
                .transpose()?,
            priority: input
                .priority
                .as_deref()
                .map(str::parse::<TaskPriority>)
                .transpose()?,
            due: input
                .due
                .as_deref()
                .map(|raw| parse_timestamp("due", raw))
                .transpose()?,
            tags: input.tags.unwrap_or_default().into_iter().collect(),
            depends_on: parse_depends_on(input.depends_on.unwrap_or_default())?,
            description: input.description,
        })
    }
}

impl TryFrom<TaskPatchInput> for TaskPatch {
    type Error = ValidationError;

    fn try_from(input: TaskPatchInput) -> Result<Self, Self::Error> {
        if let Some(description) = &input.description {
            validate_description(description)?;
        }
        Ok(TaskPatch {
            description: input.description,
            status: input
                .status
                .as_deref()
                .map(str::parse::<TaskStatus>)
                .transpose()?,
            priority: input
                .priority
                .as_deref()
                .map(str::parse::<TaskPriority>)
                .transpose()?,
            due: input
                .due
                .map(|due| due.map(|raw| parse_timestamp("due", &raw)).transpose())
                .transpose()?,
            tags: input.tags.map(|tags| tags.into_iter().collect()),
            depends_on: input.depends_on.map(parse_depends_on).transpose()?,
        })
    }
}
