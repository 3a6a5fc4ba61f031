//! 字节块内存实现

use crate::error::StorageError;
use crate::traits::BlobStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 字节块内存存储
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置内容（用于测试启动加载）。
    pub fn with_entry(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.into(), value.into());
        Self {
            blobs: RwLock::new(blobs),
        }
    }

    /// 键数量（用于测试）
    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| StorageError::Lock)?;
        Ok(blobs.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| StorageError::Lock)?;
        blobs.insert(key.to_string(), value);
        Ok(())
    }
}
