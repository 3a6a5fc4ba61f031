//! 连接注册表
//!
//! "应该轮询什么"的唯一来源。变更只改内存，调用方在调度状态同步之后
//! 调用 [`ConnectionRegistry::persist`] 把完整列表写回存储槽 `connections`；
//! 写入失败只记录日志，不影响调用方（内存状态为准）。

use crate::error::PollerError;
use crate::lock::{read, write};
use bmc_storage::BlobStore;
use bmc_telemetry::record_persist_failure;
use domain::{Connection, ConnectionDraft, ConnectionPatch, now_epoch_ms};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// 连接列表的存储键。
pub const CONNECTIONS_KEY: &str = "connections";

/// 更新结果。
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub connection: Connection,
    /// enabled 或轮询间隔是否发生变化。
    pub schedule_changed: bool,
}

pub struct ConnectionRegistry {
    connections: RwLock<BTreeMap<String, Connection>>,
    store: Arc<dyn BlobStore>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            connections: RwLock::new(BTreeMap::new()),
            store,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 从存储加载连接列表，返回加载数量。读取失败或内容损坏按空列表处理。
    pub async fn load(&self) -> usize {
        let bytes = match self.store.get(CONNECTIONS_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return 0,
            Err(err) => {
                warn!(target: "bmc.registry", error = %err, "registry_load_failed");
                return 0;
            }
        };
        let loaded: Vec<Connection> = match serde_json::from_slice(&bytes) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(target: "bmc.registry", error = %err, "registry_load_malformed");
                return 0;
            }
        };
        let count = loaded.len();
        let mut connections = write(&self.connections);
        connections.clear();
        for connection in loaded {
            connections.insert(connection.id.clone(), connection);
        }
        info!(target: "bmc.registry", count, "registry_loaded");
        count
    }

    pub fn add(&self, draft: ConnectionDraft) -> Result<Connection, PollerError> {
        draft.validate().map_err(PollerError::InvalidConnection)?;
        let connection = {
            let mut connections = write(&self.connections);
            let mut id = new_connection_id();
            while connections.contains_key(&id) {
                id = new_connection_id();
            }
            let connection = Connection::from_draft(id, draft);
            connections.insert(connection.id.clone(), connection.clone());
            connection
        };
        info!(
            target: "bmc.registry",
            connection_id = %connection.id,
            host = %connection.host,
            kind = %connection.kind,
            enabled = connection.enabled,
            "connection_added"
        );
        Ok(connection)
    }

    /// 局部更新；未知 ID 为 no-op，返回 `Ok(None)`。
    pub fn update(
        &self,
        id: &str,
        patch: ConnectionPatch,
    ) -> Result<Option<UpdateOutcome>, PollerError> {
        patch.validate().map_err(PollerError::InvalidConnection)?;
        let outcome = {
            let mut connections = write(&self.connections);
            let Some(connection) = connections.get_mut(id) else {
                return Ok(None);
            };
            let schedule_changed = connection.apply(patch);
            UpdateOutcome {
                connection: connection.clone(),
                schedule_changed,
            }
        };
        info!(
            target: "bmc.registry",
            connection_id = %id,
            schedule_changed = outcome.schedule_changed,
            "connection_updated"
        );
        Ok(Some(outcome))
    }

    pub fn remove(&self, id: &str) -> Option<Connection> {
        let removed = write(&self.connections).remove(id)?;
        info!(target: "bmc.registry", connection_id = %id, "connection_removed");
        Some(removed)
    }

    pub fn list(&self) -> Vec<Connection> {
        read(&self.connections).values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Connection> {
        read(&self.connections).get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        read(&self.connections).contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        read(&self.connections).keys().cloned().collect()
    }

    /// 成功轮询：记录时间并清除错误。只由调度器调用。
    pub(crate) fn mark_polled(&self, id: &str, now_ms: i64) {
        if let Some(connection) = write(&self.connections).get_mut(id) {
            connection.last_polled_at_ms = Some(now_ms);
            connection.last_error = None;
        }
    }

    /// 失败轮询：记录错误信息。只由调度器调用。
    pub(crate) fn mark_failed(&self, id: &str, message: &str) {
        if let Some(connection) = write(&self.connections).get_mut(id) {
            connection.last_error = Some(message.to_string());
        }
    }

    /// 写回完整列表。持锁期间取快照，保证最后一次写入的是最新状态。
    pub async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.list();
        let bytes = match serde_json::to_vec(&snapshot) {
            Ok(bytes) => bytes,
            Err(err) => {
                record_persist_failure();
                warn!(target: "bmc.registry", error = %err, "registry_serialize_failed");
                return;
            }
        };
        if let Err(err) = self.store.set(CONNECTIONS_KEY, bytes).await {
            record_persist_failure();
            warn!(
                target: "bmc.registry",
                error = %err,
                count = snapshot.len(),
                "registry_persist_failed"
            );
        }
    }
}

/// `conn-{毫秒时间戳}-{9 位随机}`
fn new_connection_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("conn-{}-{}", now_epoch_ms(), &random[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_have_timestamp_and_suffix() {
        let id = new_connection_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "conn");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(new_connection_id(), new_connection_id());
    }

    fn sample_draft(enabled: bool) -> ConnectionDraft {
        ConnectionDraft {
            name: "r1".to_string(),
            host: "10.0.0.1".to_string(),
            port: 443,
            protocol: domain::Scheme::Https,
            username: "root".to_string(),
            secret: "pw".to_string(),
            kind: domain::ConnectionKind::Redfish,
            enabled,
            poll_interval_seconds: 30,
        }
    }

    #[tokio::test]
    async fn mutations_reach_store_only_on_persist() {
        let store = Arc::new(bmc_storage::InMemoryBlobStore::new());
        let registry = ConnectionRegistry::new(store.clone());

        let connection = registry.add(sample_draft(true)).expect("add");
        assert!(store.get(CONNECTIONS_KEY).await.expect("get").is_none());

        registry.persist().await;
        let saved: Vec<Connection> =
            serde_json::from_slice(&store.get(CONNECTIONS_KEY).await.expect("get").expect("slot"))
                .expect("json");
        assert_eq!(saved.len(), 1);

        let patch = ConnectionPatch {
            enabled: Some(false),
            ..ConnectionPatch::default()
        };
        let outcome = registry
            .update(&connection.id, patch)
            .expect("update")
            .expect("known");
        assert!(outcome.schedule_changed);
        assert!(!registry.get(&connection.id).expect("present").enabled);

        assert!(registry.remove(&connection.id).is_some());
        assert!(registry.remove(&connection.id).is_none());
        registry.persist().await;
        let saved: Vec<Connection> =
            serde_json::from_slice(&store.get(CONNECTIONS_KEY).await.expect("get").expect("slot"))
                .expect("json");
        assert!(saved.is_empty());
    }
}
