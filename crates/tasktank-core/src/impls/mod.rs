//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonlSnapshotStore**: JSON Lines ファイルへの永続化（本番用）
//! - **InMemorySnapshotStore**: テスト用の写し（書き込み回数を数える）
//! - **BroadcastEventSink** / **TracingEventSink**: 変更イベントの配信

pub mod jsonl_store;
pub mod memory_store;
pub mod sinks;

// 主要な型を再エクスポート
pub use self::jsonl_store::JsonlSnapshotStore;
pub use self::memory_store::InMemorySnapshotStore;
pub use self::sinks::{BroadcastEventSink, TracingEventSink};
