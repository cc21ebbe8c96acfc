//! App - アプリケーション層
//!
//! ports の実装を組み合わせて TaskStore を組み立て、ツール操作を提供します。
//!
//! # 主要コンポーネント
//! - **StoreBuilder**: ストアの構築とワイヤリング（Fail-fast 検証）
//! - **TaskTools**: 未検証入力を受け取るツール操作（バッチは部分失敗を許す）

pub mod builder;
pub mod tools;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DEFAULT_EVENT_CAPACITY, StoreBuilder};
pub use self::tools::{
    ClaimResult, CreateManyResult, CreateOutcome, ListParams, ListResult, RelatedResult,
    ScheduledTransition, TaskTools, TaskUpdateInput, ToolError, UpdateManyResult, UpdateOutcome,
};
