//! Redis 字节块存储实现

use crate::error::StorageError;
use crate::traits::BlobStore;
use redis::AsyncCommands;

fn blob_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

/// Redis 字节块存储，键为 `{namespace}:{key}`。
pub struct RedisBlobStore {
    client: redis::Client,
    namespace: String,
}

impl RedisBlobStore {
    pub fn new(client: redis::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn connect(redis_url: &str, namespace: impl Into<String>) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, namespace))
    }
}

#[async_trait::async_trait]
impl BlobStore for RedisBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut connection = self
            .client
            .get_multiplexed_tokio_connection()
            .await?;
        let data: Option<Vec<u8>> = connection
            .get(blob_key(&self.namespace, key))
            .await?;
        Ok(data)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut connection = self
            .client
            .get_multiplexed_tokio_connection()
            .await?;
        connection
            .set::<_, _, ()>(blob_key(&self.namespace, key), value)
            .await?;
        Ok(())
    }
}
