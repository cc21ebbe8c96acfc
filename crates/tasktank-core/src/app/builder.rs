//! StoreBuilder - ストアの構築とワイヤリング
//!
//! # 方針
//! - ports の実装を差し替え可能にする（テストでは InMemory + FixedClock）
//! - 起動時検証（Fail-fast 設計）: 不正な設定は build() で弾く

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, StoreConfig};
use crate::domain::TaskStoreError;
use crate::impls::{JsonlSnapshotStore, TracingEventSink};
use crate::ports::{Clock, EventSink, IdGenerator, SnapshotStore, SystemClock, UuidGenerator};
use crate::store::{DEFAULT_SAVE_THROTTLE, StoreParts, TaskStore};

/// Default per-subscriber event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// StoreBuilder は TaskStore を構築
///
/// # 使用例
/// ```ignore
/// let store = StoreBuilder::new()
///     .tasks_path("/tmp/tasks.jsonl")
///     .save_throttle(Duration::from_millis(200))
///     .open()
///     .await?;
/// ```
///
/// # Fail-fast 設計
/// - 永続化先（パス or SnapshotStore）が未指定なら BuildError
/// - スロットル幅 0 / イベント容量 0 も BuildError
pub struct StoreBuilder {
    tasks_path: Option<PathBuf>,
    snapshot_store: Option<Arc<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    sinks: Vec<Arc<dyn EventSink>>,
    save_throttle: Duration,
    event_capacity: usize,
}

/// BuildError はストア構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no persistence configured: set tasks_path or snapshot_store")]
    MissingPersistence,

    #[error("save throttle window must be greater than zero")]
    ZeroSaveThrottle,

    #[error("event capacity must be greater than zero")]
    ZeroEventCapacity,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("initial load failed: {0}")]
    Load(#[from] TaskStoreError),
}

impl StoreBuilder {
    /// 新しい StoreBuilder を作成（SystemClock + UuidGenerator + TracingEventSink）
    pub fn new() -> Self {
        Self {
            tasks_path: None,
            snapshot_store: None,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator::new()),
            sinks: vec![Arc::new(TracingEventSink)],
            save_throttle: DEFAULT_SAVE_THROTTLE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// 設定ファイル/環境変数の値で初期化
    pub fn from_config(config: &StoreConfig) -> Result<Self, BuildError> {
        Ok(Self::new()
            .tasks_path(config.resolved_tasks_path()?)
            .save_throttle(config.save_throttle())
            .event_capacity(config.event_capacity))
    }

    /// JSONL ファイルに永続化する
    pub fn tasks_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tasks_path = Some(path.into());
        self
    }

    /// 任意の SnapshotStore を使う（tasks_path より優先）
    pub fn snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshot_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// 追加の EventSink を登録（subscribe() の broadcast とは別に呼ばれる）
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn save_throttle(mut self, window: Duration) -> Self {
        self.save_throttle = window;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// StoreBuilder を検証して TaskStore を生成（まだ load していない）
    ///
    /// # 検証
    /// - 永続化先が指定されているか
    /// - save_throttle > 0, event_capacity > 0
    pub fn build(self) -> Result<TaskStore, BuildError> {
        if self.save_throttle.is_zero() {
            return Err(BuildError::ZeroSaveThrottle);
        }
        if self.event_capacity == 0 {
            return Err(BuildError::ZeroEventCapacity);
        }
        let persistence: Arc<dyn SnapshotStore> = match (self.snapshot_store, self.tasks_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(JsonlSnapshotStore::new(path)),
            (None, None) => return Err(BuildError::MissingPersistence),
        };

        Ok(TaskStore::from_parts(StoreParts {
            persistence,
            clock: self.clock,
            ids: self.ids,
            sinks: self.sinks,
            save_throttle: self.save_throttle,
            event_capacity: self.event_capacity,
        }))
    }

    /// build() + load()
    pub async fn open(self) -> Result<TaskStore, BuildError> {
        let store = self.build()?;
        store.load().await?;
        Ok(store)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use crate::impls::InMemorySnapshotStore;
    use tempfile::TempDir;

    #[test]
    fn test_build_without_persistence_fails() {
        let result = StoreBuilder::new().build();
        assert!(matches!(result, Err(BuildError::MissingPersistence)));
    }

    #[test]
    fn test_build_rejects_zero_throttle() {
        let result = StoreBuilder::new()
            .tasks_path("/tmp/unused.jsonl")
            .save_throttle(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(BuildError::ZeroSaveThrottle)));
    }

    #[test]
    fn test_build_rejects_zero_capacity() {
        let result = StoreBuilder::new()
            .snapshot_store(Arc::new(InMemorySnapshotStore::new()))
            .event_capacity(0)
            .build();
        assert!(matches!(result, Err(BuildError::ZeroEventCapacity)));
    }

    #[test]
    fn test_build_is_not_ready_until_loaded() {
        let store = StoreBuilder::new()
            .snapshot_store(Arc::new(InMemorySnapshotStore::new()))
            .build()
            .unwrap();
        assert!(!store.is_ready());
    }

    #[tokio::test]
    async fn test_open_from_config_persists_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tasks.jsonl");
        let config = StoreConfig {
            tasks_path: Some(path.clone()),
            save_throttle_ms: 20,
            ..StoreConfig::default()
        };

        let store = StoreBuilder::from_config(&config).unwrap().open().await.unwrap();
        assert!(path.exists());
        store.add(NewTask::new("from config")).await.unwrap();
        store.shutdown().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("from config"));
    }
}
