//! EventSink port - イベント通知の抽象化
//!
//! # 実装
//! - BroadcastEventSink: tokio broadcast チャネルで購読者に配る
//! - TracingEventSink: tracing にログとして出す

use crate::domain::TaskEvent;

/// EventSink は変更イベントを受け取る
///
/// # 設計原則
/// - 呼び出しはテーブルのロック保持中（イベント順序 = 変更順序）
/// - 同期・非ブロッキングで済ませること（重い処理は受信側へ渡す）
/// - 失敗はストアに伝播しない（通知はベストエフォート）
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &TaskEvent);
}
