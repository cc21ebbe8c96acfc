//! Errors - エラー型と分類
//!
//! - `ValidationError`: 入力値の検証エラー（呼び出し側で回復可能）
//! - `PersistenceError`: ディスク読み書きの失敗
//! - `TaskStoreError`: ストア操作のエラー

use std::path::PathBuf;

use thiserror::Error;

use super::ids::TaskId;

/// Which rule a field broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Text shorter than the required number of characters.
    MinLength(usize),
    /// Value is not one of the allowed enum strings.
    OneOf(&'static [&'static str]),
    /// Value is not a well-formed task id.
    TaskId,
    /// Value is not an RFC 3339 instant.
    Timestamp,
}

impl std::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationRule::MinLength(n) => write!(f, "must be at least {n} characters"),
            ValidationRule::OneOf(allowed) => write!(f, "must be one of {}", allowed.join(", ")),
            ValidationRule::TaskId => f.write_str("must be a UUID"),
            ValidationRule::Timestamp => f.write_str("must be an RFC 3339 timestamp"),
        }
    }
}

/// A field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {rule} (got {value:?})")]
pub struct ValidationError {
    pub field: &'static str,
    pub rule: ValidationRule,
    pub value: String,
}

impl ValidationError {
    pub fn new(field: &'static str, rule: ValidationRule, value: impl Into<String>) -> Self {
        Self {
            field,
            rule,
            value: value.into(),
        }
    }
}

/// Reading or writing the on-disk mirror failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode task {id}: {source}")]
    Encode {
        id: TaskId,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("background writer stopped: {0}")]
    Writer(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by `TaskStore` operations.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    /// A mutation arrived before the initial load finished, or after shutdown.
    #[error("task store is not ready: not loaded yet or already shut down")]
    NotReady,

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field_and_rule() {
        let err = ValidationError::new("description", ValidationRule::MinLength(3), "ab");
        let msg = err.to_string();
        assert!(msg.contains("description"));
        assert!(msg.contains("at least 3"));
        assert!(msg.contains("\"ab\""));
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let rule = ValidationRule::OneOf(&["low", "medium", "high"]);
        assert_eq!(rule.to_string(), "must be one of low, medium, high");
    }

    #[test]
    fn validation_converts_into_store_error() {
        let err: TaskStoreError =
            ValidationError::new("due", ValidationRule::Timestamp, "tomorrow").into();
        assert!(matches!(err, TaskStoreError::Validation(ref v) if v.field == "due"));
    }
}
