//! 轮询调度
//!
//! 每个启用的连接一个独立的定时任务：启动时立即轮询一次，之后按
//! `poll_interval_seconds` 周期触发。定时任务只负责"触发"，每个周期作为独立任务运行，
//! 停止定时器不会中断进行中的周期，其结果在连接已删除时丢弃。
//!
//! 同一连接的周期串行执行：定时 tick 遇到进行中的周期直接跳过，
//! 手动轮询（`poll_one` / `poll_all`）等待进行中的周期结束后再执行。

use crate::bus::NotificationBus;
use crate::lock::{lock, read};
use crate::registry::ConnectionRegistry;
use bmc_normalize::{merge_failure, merge_success};
use bmc_redfish::{HttpTransport, ProxyConfig, RedfishClient, RedfishError};
use bmc_telemetry::{
    record_poll_failed, record_poll_latency_ms, record_poll_started, record_poll_succeeded,
    record_result_discarded, record_tick_skipped,
};
use domain::{Connection, ServerFields, ServerRecord, now_epoch_ms};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// 单次轮询周期的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,
    Failed(String),
    /// 周期结束时连接已被删除。
    Discarded,
}

/// `poll_all` 汇总。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// `test_connection` 结果。
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
    pub data: Option<ServerFields>,
}

/// 测试连接使用的临时 ID，不进入注册表。
pub const TEST_CONNECTION_ID: &str = "test";

struct TimerTask {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerState {
    timers: HashMap<String, TimerTask>,
    gates: HashMap<String, Arc<tokio::sync::Mutex<()>>>,
    records: BTreeMap<String, ServerRecord>,
    version: u64,
}

struct SchedulerInner {
    registry: Arc<ConnectionRegistry>,
    transport: Arc<dyn HttpTransport>,
    proxy: Arc<RwLock<ProxyConfig>>,
    bus: NotificationBus,
    state: Mutex<SchedulerState>,
    next_generation: AtomicU64,
}

#[derive(Clone)]
pub struct PollingScheduler {
    inner: Arc<SchedulerInner>,
}

impl PollingScheduler {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        transport: Arc<dyn HttpTransport>,
        proxy: Arc<RwLock<ProxyConfig>>,
        bus: NotificationBus,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                registry,
                transport,
                proxy,
                bus,
                state: Mutex::new(SchedulerState::default()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// 为已启用的连接启动定时任务（已有定时任务先停止，相位重置）。
    /// 未知或未启用的连接返回 `false`。
    pub fn start(&self, id: &str) -> bool {
        let mut state = lock(&self.inner.state);
        let connection = self.inner.registry.get(id);
        let Some(connection) = connection.filter(|connection| connection.enabled) else {
            if let Some(previous) = state.timers.remove(id) {
                previous.handle.abort();
            }
            return false;
        };
        let period = Duration::from_secs(connection.poll_interval_seconds.max(1));
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = state.timers.remove(id) {
            previous.handle.abort();
        }
        let handle = tokio::spawn(timer_loop(self.clone(), id.to_string(), generation, period));
        state
            .timers
            .insert(id.to_string(), TimerTask { generation, handle });
        info!(
            target: "bmc.scheduler",
            connection_id = %id,
            interval_seconds = connection.poll_interval_seconds,
            "polling_started"
        );
        true
    }

    /// 停止定时任务。返回后不会再触发新的周期；进行中的周期继续运行。
    pub fn stop(&self, id: &str) -> bool {
        let removed = lock(&self.inner.state).timers.remove(id);
        match removed {
            Some(task) => {
                task.handle.abort();
                info!(target: "bmc.scheduler", connection_id = %id, "polling_stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let timers: Vec<(String, TimerTask)> = lock(&self.inner.state).timers.drain().collect();
        for (id, task) in timers {
            task.handle.abort();
            info!(target: "bmc.scheduler", connection_id = %id, "polling_stopped");
        }
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        lock(&self.inner.state).timers.contains_key(id)
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.inner.state).timers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 连接删除后清理记录与闸门并发布快照。调用前注册表中已不存在该连接。
    pub fn forget(&self, id: &str) {
        let snapshot = {
            let mut state = lock(&self.inner.state);
            if let Some(task) = state.timers.remove(id) {
                task.handle.abort();
            }
            state.gates.remove(id);
            if state.records.remove(id).is_none() {
                return;
            }
            next_snapshot(&mut state)
        };
        self.publish(snapshot);
    }

    pub fn records(&self) -> Vec<ServerRecord> {
        lock(&self.inner.state).records.values().cloned().collect()
    }

    pub fn record(&self, id: &str) -> Option<ServerRecord> {
        lock(&self.inner.state).records.get(id).cloned()
    }

    /// 手动轮询一次，不改变定时相位。未知连接返回 `None`。
    pub async fn poll_one(&self, id: &str) -> Option<PollOutcome> {
        let gate = self.gate(id)?;
        let guard = gate.lock_owned().await;
        self.run_cycle(id, guard).await
    }

    /// 并发轮询所有已登记连接（含未启用的），等待全部完成，单个失败互不影响。
    pub async fn poll_all(&self) -> PollSummary {
        let ids = self.inner.registry.ids();
        let handles: Vec<(String, JoinHandle<Option<PollOutcome>>)> = ids
            .into_iter()
            .map(|id| {
                let scheduler = self.clone();
                let task_id = id.clone();
                (
                    id,
                    tokio::spawn(async move { scheduler.poll_one(&task_id).await }),
                )
            })
            .collect();

        let mut summary = PollSummary::default();
        for (id, handle) in handles {
            match handle.await {
                Ok(Some(PollOutcome::Succeeded)) => summary.succeeded.push(id),
                Ok(Some(PollOutcome::Failed(message))) => summary.failed.push((id, message)),
                Ok(Some(PollOutcome::Discarded)) | Ok(None) => {}
                Err(err) => {
                    warn!(target: "bmc.scheduler", connection_id = %id, error = %err, "poll_task_aborted");
                    summary.failed.push((id, err.to_string()));
                }
            }
        }
        summary
    }

    /// 探测候选连接：根资源 + 一次完整快照。不触碰注册表与调度状态。
    pub async fn test_connection(&self, candidate: &Connection) -> TestOutcome {
        let mut probe = candidate.clone();
        probe.id = TEST_CONNECTION_ID.to_string();
        let client = self.client_for(&probe);
        let result = async {
            let root = client.get_root().await?;
            let fields = client.fetch_canonical_snapshot().await?;
            Ok::<_, RedfishError>((root, fields))
        }
        .await;
        match result {
            Ok((root, fields)) => TestOutcome {
                success: true,
                message: format!(
                    "Connected successfully! Redfish version: {}",
                    root.redfish_version.as_deref().unwrap_or("unknown")
                ),
                data: Some(fields),
            },
            Err(err) => {
                debug!(
                    target: "bmc.scheduler",
                    host = %candidate.host,
                    error = %err,
                    "test_connection_failed"
                );
                TestOutcome {
                    success: false,
                    message: err.to_string(),
                    data: None,
                }
            }
        }
    }

    pub(crate) fn client_for(&self, connection: &Connection) -> RedfishClient {
        let routing = read(&self.inner.proxy).routing();
        RedfishClient::new(connection, routing, self.inner.transport.clone())
    }

    /// 连接仍在注册表中时取得其闸门。与 `forget` 同在状态锁内判断，删除后不会再建闸门。
    fn gate(&self, id: &str) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let mut state = lock(&self.inner.state);
        if !self.inner.registry.contains(id) {
            return None;
        }
        Some(state.gates.entry(id.to_string()).or_default().clone())
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        lock(&self.inner.state).gates.len()
    }

    /// 定时 tick：定时任务仍有效且没有进行中的周期时，派生独立周期任务。
    fn on_tick(&self, id: &str, generation: u64) {
        let guard = {
            let mut state = lock(&self.inner.state);
            let current = state.timers.get(id).map(|task| task.generation);
            if current != Some(generation) {
                return;
            }
            let gate = state.gates.entry(id.to_string()).or_default().clone();
            match gate.try_lock_owned() {
                Ok(guard) => guard,
                Err(_) => {
                    record_tick_skipped();
                    debug!(target: "bmc.scheduler", connection_id = %id, "tick_skipped");
                    return;
                }
            }
        };
        let scheduler = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            scheduler.run_cycle(&id, guard).await;
        });
    }

    async fn run_cycle(&self, id: &str, _guard: OwnedMutexGuard<()>) -> Option<PollOutcome> {
        let connection = self.inner.registry.get(id)?;
        record_poll_started();
        let client = self.client_for(&connection);
        let started = Instant::now();
        let result = client.fetch_canonical_snapshot().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        record_poll_latency_ms(elapsed_ms);
        Some(self.apply(&connection, result, elapsed_ms))
    }

    /// 在状态锁内校验连接仍存在并合并结果，锁外发布事件。
    fn apply(
        &self,
        connection: &Connection,
        result: Result<ServerFields, RedfishError>,
        elapsed_ms: u64,
    ) -> PollOutcome {
        let id = connection.id.as_str();
        let now = now_epoch_ms();
        let (outcome, snapshot) = {
            let mut state = lock(&self.inner.state);
            if !self.inner.registry.contains(id) {
                drop(state);
                record_result_discarded();
                debug!(target: "bmc.scheduler", connection_id = %id, "poll_result_discarded");
                return PollOutcome::Discarded;
            }
            let previous = state.records.get(id);
            let (record, outcome) = match result {
                Ok(fields) => {
                    self.inner.registry.mark_polled(id, now);
                    (
                        merge_success(previous, fields, connection, now),
                        PollOutcome::Succeeded,
                    )
                }
                Err(err) => {
                    let message = err.to_string();
                    self.inner.registry.mark_failed(id, &message);
                    (
                        merge_failure(previous, connection),
                        PollOutcome::Failed(message),
                    )
                }
            };
            state.records.insert(id.to_string(), record);
            (outcome, next_snapshot(&mut state))
        };

        match &outcome {
            PollOutcome::Succeeded => {
                record_poll_succeeded();
                debug!(
                    target: "bmc.scheduler",
                    connection_id = %id,
                    host = %connection.host,
                    elapsed_ms,
                    "poll_succeeded"
                );
            }
            PollOutcome::Failed(message) => {
                record_poll_failed();
                warn!(
                    target: "bmc.scheduler",
                    connection_id = %id,
                    host = %connection.host,
                    elapsed_ms,
                    error = %message,
                    "poll_failed"
                );
                self.inner.bus.publish_error(id, message);
            }
            PollOutcome::Discarded => {}
        }
        self.publish(snapshot);
        outcome
    }

    fn publish(&self, (version, records): (u64, Arc<Vec<ServerRecord>>)) {
        self.inner.bus.publish_snapshot(version, records);
    }
}

fn next_snapshot(state: &mut SchedulerState) -> (u64, Arc<Vec<ServerRecord>>) {
    state.version += 1;
    (
        state.version,
        Arc::new(state.records.values().cloned().collect()),
    )
}

async fn timer_loop(scheduler: PollingScheduler, id: String, generation: u64, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        scheduler.on_tick(&id, generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmc_redfish::{HttpRequest, HttpResponse};
    use bmc_storage::InMemoryBlobStore;
    use domain::{ConnectionDraft, ConnectionKind, Scheme};

    struct Unreachable;

    #[async_trait::async_trait]
    impl HttpTransport for Unreachable {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RedfishError> {
            Err(RedfishError::Transport(format!("connection refused: {}", request.url)))
        }
    }

    fn scheduler() -> (Arc<ConnectionRegistry>, PollingScheduler) {
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(InMemoryBlobStore::new())));
        let scheduler = PollingScheduler::new(
            registry.clone(),
            Arc::new(Unreachable),
            Arc::new(RwLock::new(ProxyConfig::default())),
            NotificationBus::new(),
        );
        (registry, scheduler)
    }

    fn draft() -> ConnectionDraft {
        ConnectionDraft {
            name: "bmc-a".to_string(),
            host: "10.0.9.1".to_string(),
            port: 443,
            protocol: Scheme::Https,
            username: "root".to_string(),
            secret: "pw".to_string(),
            kind: ConnectionKind::Redfish,
            enabled: false,
            poll_interval_seconds: 30,
        }
    }

    #[tokio::test]
    async fn removed_connection_never_gets_a_new_gate() {
        let (registry, scheduler) = scheduler();
        let connection = registry.add(draft()).expect("add");

        let outcome = scheduler.poll_one(&connection.id).await;
        assert!(matches!(outcome, Some(PollOutcome::Failed(_))));
        assert_eq!(scheduler.gate_count(), 1);

        registry.remove(&connection.id).expect("registered");
        assert!(scheduler.gate(&connection.id).is_none());
        scheduler.forget(&connection.id);
        assert_eq!(scheduler.gate_count(), 0);

        assert!(scheduler.gate(&connection.id).is_none());
        assert_eq!(scheduler.poll_one(&connection.id).await, None);
        assert_eq!(scheduler.gate_count(), 0);
        assert!(scheduler.records().is_empty());
    }

    #[tokio::test]
    async fn start_refuses_removed_or_disabled_connections() {
        let (registry, scheduler) = scheduler();
        let connection = registry.add(draft()).expect("add");
        assert!(!scheduler.start(&connection.id));
        assert!(scheduler.scheduled_ids().is_empty());

        registry.remove(&connection.id).expect("registered");
        assert!(!scheduler.start(&connection.id));
        assert!(scheduler.scheduled_ids().is_empty());
    }
}
