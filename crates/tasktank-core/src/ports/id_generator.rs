//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UuidGenerator**: 暗号学的に安全な乱数による UUID v4（本番用）

use uuid::Builder;

use crate::domain::TaskId;

/// IdGenerator はタスク ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// Task ID を生成
    fn generate_task_id(&self) -> TaskId;
}

/// UUID v4 generator backed by `rand`'s thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl UuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidGenerator {
    fn generate_task_id(&self) -> TaskId {
        let bytes: [u8; 16] = rand::random();
        TaskId::from_uuid(Builder::from_random_bytes(bytes).into_uuid())
    }
}
