//! 对外服务入口：注册表 + 调度 + 通知总线 + 转发代理设置。
//!
//! 显式构造、依赖注入（HTTP 传输与存储），同一进程内可存在多个互不影响的实例。

use crate::bus::{NotificationBus, Subscription};
use crate::error::PollerError;
use crate::lock::{read, write};
use crate::registry::ConnectionRegistry;
use crate::scheduler::{PollOutcome, PollSummary, PollingScheduler, TestOutcome};
use bmc_redfish::{DEFAULT_RESOURCE_ID, HttpTransport, PowerAction, ProxyConfig};
use bmc_storage::BlobStore;
use bmc_telemetry::{record_persist_failure, record_power_action, record_power_action_failure};
use domain::{Connection, ConnectionDraft, ConnectionPatch, ServerRecord};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// 转发代理设置的存储键。
pub const PROXY_KEY: &str = "redfish-proxy";

struct ServiceInner {
    registry: Arc<ConnectionRegistry>,
    scheduler: PollingScheduler,
    bus: NotificationBus,
    store: Arc<dyn BlobStore>,
    proxy: Arc<RwLock<ProxyConfig>>,
}

#[derive(Clone)]
pub struct BmcService {
    inner: Arc<ServiceInner>,
}

impl BmcService {
    /// `proxy` 为默认代理设置，存储中已有的设置在 [`BmcService::start`] 时覆盖它。
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn BlobStore>,
        proxy: ProxyConfig,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(store.clone()));
        let proxy = Arc::new(RwLock::new(proxy));
        let bus = NotificationBus::new();
        let scheduler =
            PollingScheduler::new(registry.clone(), transport, proxy.clone(), bus.clone());
        Self {
            inner: Arc::new(ServiceInner {
                registry,
                scheduler,
                bus,
                store,
                proxy,
            }),
        }
    }

    /// 加载代理设置与连接列表，并为启用的连接启动轮询。返回加载的连接数。
    pub async fn start(&self) -> usize {
        self.load_proxy().await;
        let count = self.inner.registry.load().await;
        for connection in self.inner.registry.list() {
            if connection.enabled {
                self.inner.scheduler.start(&connection.id);
            }
        }
        count
    }

    async fn load_proxy(&self) {
        match self.inner.store.get(PROXY_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<ProxyConfig>(&bytes) {
                Ok(config) => *write(&self.inner.proxy) = config,
                Err(err) => {
                    warn!(target: "bmc.registry", error = %err, "proxy_config_malformed")
                }
            },
            Ok(None) => {}
            Err(err) => warn!(target: "bmc.registry", error = %err, "proxy_config_load_failed"),
        }
    }

    pub async fn add_connection(&self, draft: ConnectionDraft) -> Result<Connection, PollerError> {
        let connection = self.inner.registry.add(draft)?;
        if connection.enabled {
            self.inner.scheduler.start(&connection.id);
        }
        self.inner.registry.persist().await;
        Ok(connection)
    }

    /// 局部更新。enabled 或轮询间隔变化时先停止再按需重启（相位重置），
    /// 调度状态与内存一致后才写存储。未知 ID 返回 `Ok(None)`。
    pub async fn update_connection(
        &self,
        id: &str,
        patch: ConnectionPatch,
    ) -> Result<Option<Connection>, PollerError> {
        let Some(outcome) = self.inner.registry.update(id, patch)? else {
            return Ok(None);
        };
        if outcome.schedule_changed {
            self.inner.scheduler.stop(id);
            if outcome.connection.enabled {
                self.inner.scheduler.start(id);
            }
        }
        self.inner.registry.persist().await;
        Ok(Some(outcome.connection))
    }

    /// 删除连接：移出注册表、停止定时任务、丢弃记录并发布快照，最后持久化。
    pub async fn remove_connection(&self, id: &str) -> bool {
        if self.inner.registry.remove(id).is_none() {
            return false;
        }
        self.inner.scheduler.forget(id);
        self.inner.registry.persist().await;
        true
    }

    pub fn list_connections(&self) -> Vec<Connection> {
        self.inner.registry.list()
    }

    pub fn get_connection(&self, id: &str) -> Option<Connection> {
        self.inner.registry.get(id)
    }

    /// 当前全部服务器记录（按连接 ID 排序）。
    pub fn list_servers(&self) -> Vec<ServerRecord> {
        self.inner.scheduler.records()
    }

    pub fn get_server(&self, id: &str) -> Option<ServerRecord> {
        self.inner.scheduler.record(id)
    }

    pub async fn poll_one(&self, id: &str) -> Result<PollOutcome, PollerError> {
        self.inner
            .scheduler
            .poll_one(id)
            .await
            .ok_or_else(|| PollerError::UnknownConnection(id.to_string()))
    }

    pub async fn poll_all(&self) -> PollSummary {
        self.inner.scheduler.poll_all().await
    }

    pub async fn test_connection(&self, draft: ConnectionDraft) -> TestOutcome {
        let candidate = Connection::from_draft(crate::scheduler::TEST_CONNECTION_ID, draft);
        self.inner.scheduler.test_connection(&candidate).await
    }

    pub async fn power_action(&self, id: &str, action: PowerAction) -> Result<(), PollerError> {
        let connection = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| PollerError::UnknownConnection(id.to_string()))?;
        let client = self.inner.scheduler.client_for(&connection);
        record_power_action();
        match client.power_action(DEFAULT_RESOURCE_ID, action).await {
            Ok(()) => {
                info!(
                    target: "bmc.redfish",
                    connection_id = %id,
                    reset_type = action.reset_type(),
                    "power_action_sent"
                );
                Ok(())
            }
            Err(err) => {
                record_power_action_failure();
                warn!(
                    target: "bmc.redfish",
                    connection_id = %id,
                    reset_type = action.reset_type(),
                    error = %err,
                    "power_action_failed"
                );
                Err(err.into())
            }
        }
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        read(&self.inner.proxy).clone()
    }

    /// 修改代理设置，下一次请求起生效；写入存储失败只记录日志。
    pub async fn configure_proxy(&self, config: ProxyConfig) -> ProxyConfig {
        *write(&self.inner.proxy) = config.clone();
        info!(
            target: "bmc.registry",
            proxy_url = %config.proxy_url,
            enabled = config.enabled,
            "proxy_configured"
        );
        match serde_json::to_vec(&config) {
            Ok(bytes) => {
                if let Err(err) = self.inner.store.set(PROXY_KEY, bytes).await {
                    record_persist_failure();
                    warn!(target: "bmc.registry", error = %err, "proxy_config_persist_failed");
                }
            }
            Err(err) => {
                record_persist_failure();
                warn!(target: "bmc.registry", error = %err, "proxy_config_persist_failed");
            }
        }
        config
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[ServerRecord]) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(handler)
    }

    pub fn subscribe_to_errors<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe_to_errors(handler)
    }

    /// 当前有定时任务的连接 ID。
    pub fn scheduled_connection_ids(&self) -> Vec<String> {
        self.inner.scheduler.scheduled_ids()
    }

    /// 停止所有定时任务并移除全部订阅者。进行中的周期自行结束。
    pub fn shutdown(&self) {
        self.inner.scheduler.stop_all();
        self.inner.bus.clear();
        info!(target: "bmc.scheduler", "service_shutdown");
    }
}
