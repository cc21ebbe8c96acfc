//! SnapshotStore port - タスク表の永続化
//!
//! ストアはテーブル全体を丸ごと書き出し、起動時に丸ごと読み戻します。
//! 実装はエンティティを変更せず、シリアライズ/デシリアライズのみを行います。

use async_trait::async_trait;

use crate::domain::{PersistenceError, Task};

/// Result of reading the durable mirror.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    /// Lines that could not be decoded and were dropped.
    pub skipped: usize,
    /// True when nothing existed yet and an empty mirror was created.
    pub created: bool,
}

/// SnapshotStore は durable mirror（ディスク上の写し）
///
/// # 設計原則
/// - `write` は全件書き換え（append ではない）
/// - 途中でクラッシュしても壊れたファイルを残さないこと
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read every task. A single bad record must not fail the load.
    async fn load(&self) -> Result<LoadReport, PersistenceError>;

    /// Replace the mirror with exactly `tasks`.
    async fn write(&self, tasks: Vec<Task>) -> Result<(), PersistenceError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
