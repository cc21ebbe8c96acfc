//! tasktank-core
//!
//! Core building blocks for the tasktank store: a process-local task table
//! mirrored to a JSON Lines file.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, input, errors, events）
//! - **ports**: 抽象化レイヤー（SnapshotStore, EventSink, Clock, IdGenerator）
//! - **impls**: ports の実装（JsonlSnapshotStore, InMemorySnapshotStore, sinks）
//! - **store**: TaskStore 本体（CRUD, 依存関係, 優先度, スロットル保存, 自動遷移）
//! - **app**: 構築とツール操作（StoreBuilder, TaskTools）
//! - **config**: 設定ファイル + 環境変数

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod store;

pub use self::app::{StoreBuilder, TaskTools};
pub use self::config::StoreConfig;
pub use self::domain::{NewTask, Task, TaskEvent, TaskId, TaskPatch, TaskPriority, TaskStatus};
pub use self::store::{TaskFilter, TaskStore};
