//! TaskTools - ツール呼び出し層
//!
//! 外部（エージェント / CLI）から届く未検証の文字列入力を受け取り、
//! 検証してストアに渡し、serde でシリアライズ可能な結果を返します。
//!
//! # バッチ操作
//! - create_many / update_many は 1 件ずつ独立に処理（部分失敗を許す）
//! - 結果には件ごとの成否と集計を含める

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::input::parse_task_id;
use crate::domain::{
    NewTask, NewTaskInput, Task, TaskId, TaskPatch, TaskPatchInput, TaskPriority, TaskStatus,
    TaskStoreError, ValidationError,
};
use crate::store::{TaskFilter, TaskStore};

/// Errors surfaced to a tool caller.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("task with ID {0} not found")]
    NotFound(TaskId),

    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<TaskStoreError> for ToolError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(id) => ToolError::NotFound(id),
            TaskStoreError::Validation(err) => ToolError::InvalidInput(err),
            other => ToolError::Store(other),
        }
    }
}

/// Per-item outcome of `create_many`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOutcome {
    /// Position in the request batch.
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateOutcome {
    fn failed(index: usize, error: String) -> Self {
        Self {
            index,
            success: false,
            task: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateManyResult {
    pub results: Vec<CreateOutcome>,
    pub created: usize,
    pub failed: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub tasks: Vec<Task>,
    pub count: usize,
    pub filters: TaskFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimResult {
    pub task: Option<Task>,
    pub message: String,
}

/// One entry of an `update_many` batch: the id plus patch fields inline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskUpdateInput {
    pub id: String,
    #[serde(flatten)]
    pub patch: TaskPatchInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateOutcome {
    fn failed(id: String, error: String) -> Self {
        Self {
            id,
            success: false,
            task: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateManyResult {
    pub updates: Vec<UpdateOutcome>,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResult {
    pub task: Task,
    pub depends_on: Vec<Task>,
    pub dependents: Vec<Task>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTransition {
    pub id: TaskId,
    pub status: TaskStatus,
    pub delay_ms: u64,
}

/// Tool surface over a loaded `TaskStore`.
#[derive(Debug, Clone)]
pub struct TaskTools {
    store: TaskStore,
}

impl TaskTools {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Create every valid item; invalid ones are reported, not fatal.
    ///
    /// A store failure (e.g. `NotReady`) stops the batch: that item and every
    /// later one are reported as failed, earlier results are kept.
    pub async fn create_many(&self, inputs: Vec<NewTaskInput>) -> Result<CreateManyResult, ToolError> {
        let mut results = Vec::with_capacity(inputs.len());
        let mut halted: Option<String> = None;
        for (index, input) in inputs.into_iter().enumerate() {
            if let Some(reason) = &halted {
                results.push(CreateOutcome::failed(index, format!("not applied: {reason}")));
                continue;
            }
            let outcome = match NewTask::try_from(input) {
                Ok(new_task) => self.store.add(new_task).await.map_err(ToolError::from),
                Err(err) => Err(ToolError::from(err)),
            };
            match outcome {
                Ok(task) => results.push(CreateOutcome {
                    index,
                    success: true,
                    task: Some(task),
                    error: None,
                }),
                Err(err) => {
                    if matches!(err, ToolError::Store(_)) {
                        warn!(index, error = %err, "create_many stopped");
                        halted = Some(err.to_string());
                    }
                    results.push(CreateOutcome::failed(index, err.to_string()));
                }
            }
        }

        let created = results.iter().filter(|r| r.success).count();
        let failed = results.len() - created;
        info!(created, failed, "create_many");
        Ok(CreateManyResult {
            results,
            created,
            failed,
            message: format!("Created {created} tasks"),
        })
    }

    pub async fn list(&self, params: ListParams) -> Result<ListResult, ToolError> {
        let filter = TaskFilter {
            status: params.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
            priority: params
                .priority
                .as_deref()
                .map(str::parse::<TaskPriority>)
                .transpose()?,
        };
        let tasks = self.store.list(filter).await;
        Ok(ListResult {
            count: tasks.len(),
            tasks,
            filters: filter,
        })
    }

    /// Highest-priority todo task, marked in-progress in the same step.
    pub async fn claim_next(&self) -> Result<ClaimResult, ToolError> {
        let claimed = self
            .store
            .claim_highest_priority(TaskStatus::Todo, TaskStatus::InProgress)
            .await?;
        Ok(match claimed {
            Some(task) => ClaimResult {
                task: Some(task),
                message: "Task marked as in-progress".to_string(),
            },
            None => ClaimResult {
                task: None,
                message: "No todo tasks found".to_string(),
            },
        })
    }

    pub async fn complete(&self, id: &str) -> Result<Task, ToolError> {
        let id = parse_task_id("id", id)?;
        self.store
            .update(id, TaskPatch::status(TaskStatus::Done))
            .await?
            .ok_or(ToolError::NotFound(id))
    }

    /// Apply each patch independently; missing ids and bad fields are per-item failures.
    ///
    /// A store failure stops the batch the same way as in `create_many`.
    pub async fn update_many(&self, updates: Vec<TaskUpdateInput>) -> Result<UpdateManyResult, ToolError> {
        let mut outcomes = Vec::with_capacity(updates.len());
        let mut halted: Option<String> = None;
        for update in updates {
            let raw_id = update.id.clone();
            if let Some(reason) = &halted {
                outcomes.push(UpdateOutcome::failed(raw_id, format!("not applied: {reason}")));
                continue;
            }
            match self.update_one(update).await {
                Ok(task) => outcomes.push(UpdateOutcome {
                    id: raw_id,
                    success: true,
                    task: Some(task),
                    error: None,
                }),
                Err(err) => {
                    if matches!(err, ToolError::Store(_)) {
                        warn!(id = %raw_id, error = %err, "update_many stopped");
                        halted = Some(err.to_string());
                    } else {
                        debug!(id = %raw_id, error = %err, "update rejected");
                    }
                    outcomes.push(UpdateOutcome::failed(raw_id, err.to_string()));
                }
            }
        }

        let success = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - success;
        info!(success, failed, "update_many");
        Ok(UpdateManyResult {
            updates: outcomes,
            success,
            failed,
        })
    }

    async fn update_one(&self, update: TaskUpdateInput) -> Result<Task, ToolError> {
        let id = parse_task_id("id", &update.id)?;
        let patch = TaskPatch::try_from(update.patch)?;
        self.store
            .update(id, patch)
            .await?
            .ok_or(ToolError::NotFound(id))
    }

    pub async fn related(&self, id: &str) -> Result<RelatedResult, ToolError> {
        let id = parse_task_id("id", id)?;
        let task = self.store.get(id).await.ok_or(ToolError::NotFound(id))?;
        let depends_on = self.store.get_dependencies(id).await;
        let dependents = self.store.get_dependents(id).await;
        Ok(RelatedResult {
            count: self.store.get_related_tasks(id).await.len(),
            task,
            depends_on,
            dependents,
        })
    }

    pub async fn delete(&self, id: &str) -> Result<TaskId, ToolError> {
        let id = parse_task_id("id", id)?;
        if self.store.delete(id).await? {
            Ok(id)
        } else {
            Err(ToolError::NotFound(id))
        }
    }

    pub async fn schedule_transition(
        &self,
        id: &str,
        delay_ms: u64,
        status: &str,
    ) -> Result<ScheduledTransition, ToolError> {
        let id = parse_task_id("id", id)?;
        let status: TaskStatus = status.parse()?;
        self.store
            .set_auto_transition(id, Duration::from_millis(delay_ms), status)
            .await?;
        Ok(ScheduledTransition { id, status, delay_ms })
    }
}
