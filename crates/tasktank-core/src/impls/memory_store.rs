//! InMemorySnapshotStore - 開発用・テスト用の永続化
//!
//! ディスクに触れずに `SnapshotStore` を満たします。
//! 書き込み回数を数えるので、スロットリングの検証にも使えます。

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{PersistenceError, Task};
use crate::ports::{LoadReport, SnapshotStore};

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    tasks: Mutex<Vec<Task>>,
    writes: AtomicUsize,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the mirror, as if a file already existed.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of physical writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Contents of the last write.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<LoadReport, PersistenceError> {
        Ok(LoadReport {
            tasks: self.snapshot(),
            ..LoadReport::default()
        })
    }

    async fn write(&self, tasks: Vec<Task>) -> Result<(), PersistenceError> {
        *self.tasks.lock().unwrap_or_else(|e| e.into_inner()) = tasks;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
