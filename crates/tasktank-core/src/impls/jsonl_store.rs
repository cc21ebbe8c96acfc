//! JsonlSnapshotStore - 1 行 1 タスクの JSON Lines ファイル
//!
//! # ファイル形式
//! - UTF-8、1 行に JSON オブジェクト 1 つ（配列の括弧なし）
//! - 空行は無視
//! - 読めない行は警告を出してスキップ（起動は止めない）
//!
//! # 書き込み
//! 同じディレクトリの一時ファイルに書き、fsync してから rename で置き換えます。
//! 途中でクラッシュしても、元のファイルか新しいファイルのどちらかが残ります。

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::domain::{PersistenceError, Task, TaskId, TaskPriority, TaskStatus};
use crate::ports::{LoadReport, SnapshotStore};

/// On-disk record shape, more forgiving than `Task` itself.
///
/// Older files were written without `updated` (and sometimes without the
/// collections); those load with `updated = created` and empty sets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: TaskId,
    description: String,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    priority: TaskPriority,
    created: DateTime<Utc>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
    #[serde(default)]
    due: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    depends_on: BTreeSet<TaskId>,
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        Task {
            id: stored.id,
            description: stored.description,
            status: stored.status,
            priority: stored.priority,
            created: stored.created,
            updated: stored.updated.unwrap_or(stored.created).max(stored.created),
            due: stored.due,
            tags: stored.tags,
            depends_on: stored.depends_on,
        }
    }
}

/// Decode one line. `None` for blank lines.
fn decode_line(line: &str) -> Option<Result<Task, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let decoded = serde_json::from_str::<StoredTask>(line)
        .map_err(|e| e.to_string())
        .map(Task::from)
        .and_then(|task| task.validate().map(|()| task).map_err(|e| e.to_string()));
    Some(decoded)
}

/// File-backed mirror of the task table.
#[derive(Debug, Clone)]
pub struct JsonlSnapshotStore {
    path: PathBuf,
}

impl JsonlSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(path: &Path) -> &Path {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn load_blocking(path: &Path) -> Result<LoadReport, PersistenceError> {
        if !path.exists() {
            let dir = Self::parent_dir(path);
            fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;
            fs::write(path, b"").map_err(|e| PersistenceError::io(path, e))?;
            info!(path = %path.display(), "task file did not exist, created empty storage");
            return Ok(LoadReport {
                created: true,
                ..LoadReport::default()
            });
        }

        let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;

        let mut tasks: Vec<Task> = Vec::new();
        let mut index: HashMap<TaskId, usize> = HashMap::new();
        let mut skipped = 0;

        for (n, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            let line_no = n + 1;
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!(path = %path.display(), line = line_no, "skipping task line: not valid UTF-8");
                skipped += 1;
                continue;
            };
            match decode_line(line) {
                None => {}
                Some(Ok(task)) => match index.get(&task.id) {
                    Some(&slot) => {
                        warn!(path = %path.display(), line = line_no, task_id = %task.id, "duplicate task id, later line wins");
                        tasks[slot] = task;
                    }
                    None => {
                        index.insert(task.id, tasks.len());
                        tasks.push(task);
                    }
                },
                Some(Err(error)) => {
                    warn!(path = %path.display(), line = line_no, %error, "skipping unparseable task line");
                    skipped += 1;
                }
            }
        }

        info!(path = %path.display(), count = tasks.len(), skipped, "loaded tasks");
        Ok(LoadReport {
            tasks,
            skipped,
            created: false,
        })
    }

    fn write_blocking(path: &Path, mut tasks: Vec<Task>) -> Result<(), PersistenceError> {
        let dir = Self::parent_dir(path);
        fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;

        tasks.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

        let mut buffer = Vec::new();
        for task in &tasks {
            let json = serde_json::to_string(task)
                .map_err(|source| PersistenceError::Encode { id: task.id, source })?;
            buffer.extend_from_slice(json.as_bytes());
            buffer.push(b'\n');
        }

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;
        temp.write_all(&buffer)
            .map_err(|e| PersistenceError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PersistenceError::io(temp.path(), e))?;
        temp.persist(path).map_err(|source| PersistenceError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for JsonlSnapshotStore {
    async fn load(&self) -> Result<LoadReport, PersistenceError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&path))
            .await
            .map_err(|e| PersistenceError::Writer(format!("load task failed: {e}")))?
    }

    async fn write(&self, tasks: Vec<Task>) -> Result<(), PersistenceError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_blocking(&path, tasks))
            .await
            .map_err(|e| PersistenceError::Writer(format!("write task failed: {e}")))?
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
