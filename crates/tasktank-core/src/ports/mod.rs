//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部（ファイルシステム、時計、乱数、購読者）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod snapshot_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UuidGenerator};
pub use self::snapshot_store::{LoadReport, SnapshotStore};
