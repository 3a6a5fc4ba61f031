//! 追踪、轮询计数指标与请求 ID 生成。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_started: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub ticks_skipped: u64,
    pub results_discarded: u64,
    pub snapshots_published: u64,
    pub error_events_published: u64,
    pub handler_panics: u64,
    pub persist_failures: u64,
    pub power_actions: u64,
    pub power_action_failures: u64,
    pub forward_failures: u64,
    pub poll_latency_ms_total: u64,
    pub poll_latency_ms_count: u64,
}

/// 进程级计数指标。
pub struct TelemetryMetrics {
    polls_started: AtomicU64,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    ticks_skipped: AtomicU64,
    results_discarded: AtomicU64,
    snapshots_published: AtomicU64,
    error_events_published: AtomicU64,
    handler_panics: AtomicU64,
    persist_failures: AtomicU64,
    power_actions: AtomicU64,
    power_action_failures: AtomicU64,
    forward_failures: AtomicU64,
    poll_latency_ms_total: AtomicU64,
    poll_latency_ms_count: AtomicU64,
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            polls_started: AtomicU64::new(0),
            polls_succeeded: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            results_discarded: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            error_events_published: AtomicU64::new(0),
            handler_panics: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            power_actions: AtomicU64::new(0),
            power_action_failures: AtomicU64::new(0),
            forward_failures: AtomicU64::new(0),
            poll_latency_ms_total: AtomicU64::new(0),
            poll_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_started: self.polls_started.load(Ordering::Relaxed),
            polls_succeeded: self.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            error_events_published: self.error_events_published.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            power_actions: self.power_actions.load(Ordering::Relaxed),
            power_action_failures: self.power_action_failures.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
            poll_latency_ms_total: self.poll_latency_ms_total.load(Ordering::Relaxed),
            poll_latency_ms_count: self.poll_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录轮询周期开始次数。
pub fn record_poll_started() {
    metrics().polls_started.fetch_add(1, Ordering::Relaxed);
}

pub fn record_poll_succeeded() {
    metrics().polls_succeeded.fetch_add(1, Ordering::Relaxed);
}

pub fn record_poll_failed() {
    metrics().polls_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录因上一周期未结束而跳过的定时 tick。
pub fn record_tick_skipped() {
    metrics().ticks_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接已删除、结果被丢弃的周期。
pub fn record_result_discarded() {
    metrics().results_discarded.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshot_published() {
    metrics()
        .snapshots_published
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_error_event_published() {
    metrics()
        .error_events_published
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅者回调 panic 次数。
pub fn record_handler_panic() {
    metrics().handler_panics.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接注册表持久化失败次数。
pub fn record_persist_failure() {
    metrics().persist_failures.fetch_add(1, Ordering::Relaxed);
}

pub fn record_power_action() {
    metrics().power_actions.fetch_add(1, Ordering::Relaxed);
}

pub fn record_power_action_failure() {
    metrics()
        .power_action_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录 MQTT 转发失败次数。
pub fn record_forward_failure() {
    metrics().forward_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录单次轮询周期耗时（毫秒）。
pub fn record_poll_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .poll_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .poll_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
