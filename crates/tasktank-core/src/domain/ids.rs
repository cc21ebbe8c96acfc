//! Domain identifiers (strongly-typed IDs).
//!
//! # UUID ベースの ID
//! タスク ID は UUID (v4) の newtype です。
//! ファイル上ではハイフン区切りの文字列として保存されます。
//!
//! ## なぜ newtype を使うのか？
//! - `dependsOn` の参照先と任意の文字列を型で区別できる
//! - パース（形式チェック）を境界で一度だけ行える

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a Task.
///
/// Serialized transparently as the hyphenated UUID string, e.g.
/// `"67e55044-10b1-426f-9247-bb680e5fe0c8"`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// UUID から TaskId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 内部の UUID を取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse a caller-supplied string. Accepts any format `uuid` accepts
    /// (hyphenated, simple, braced, urn).
    pub fn parse(input: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(input.trim()).map(Self)
    }
}

impl From<Uuid> for TaskId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_hyphenated_uuid() {
        let uuid = Uuid::new_v4();
        let id = TaskId::from_uuid(uuid);

        assert_eq!(id.to_string(), uuid.hyphenated().to_string());
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn parse_accepts_surrounding_whitespace() {
        let id = TaskId::parse(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(TaskId::parse("task-1").is_err());
        assert!(TaskId::parse("").is_err());
        assert!("67e55044-10b1-426f-9247".parse::<TaskId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::from_uuid(Uuid::new_v4());

        // Serialize/Deserialize のラウンドトリップテスト
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{id}\""));
        let deserialized: TaskId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn newtype_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<TaskId>(), size_of::<Uuid>());
    }
}
