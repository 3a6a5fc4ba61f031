//! 存储接口 Trait 定义
//!
//! 设计原则：
//! - 键为不透明字符串，值为不透明字节块
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发（`Arc<dyn BlobStore>`）

use crate::error::StorageError;
use async_trait::async_trait;

/// 按键读写字节块的存储接口。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 读取键对应的字节块，不存在返回 `None`。
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 覆盖写入键对应的字节块。
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}
