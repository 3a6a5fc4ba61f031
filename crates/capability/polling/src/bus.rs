//! 通知总线
//!
//! 两个独立通道：
//! - 数据：完整服务器记录列表（快照）。新订阅者立即收到当前快照。
//! - 错误：`(connection_id, message)`，瞬时事件，不回放。
//!
//! 回调在锁外（数据通道在投递锁内）逐个调用，单个回调 panic 不影响其余回调。
//! 快照携带单调递增的版本号，旧于已投递版本的快照直接丢弃。
//! 回调内不能再调用 [`NotificationBus::subscribe`]。

use crate::lock::{lock, read, write};
use bmc_telemetry::{record_error_event_published, record_handler_panic, record_snapshot_published};
use domain::ServerRecord;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::warn;

pub type SnapshotHandler = Arc<dyn Fn(&[ServerRecord]) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

struct Delivered {
    version: u64,
    records: Arc<Vec<ServerRecord>>,
}

struct BusInner {
    next_id: AtomicU64,
    data_handlers: RwLock<BTreeMap<u64, SnapshotHandler>>,
    error_handlers: RwLock<BTreeMap<u64, ErrorHandler>>,
    delivered: Mutex<Delivered>,
}

#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                data_handlers: RwLock::new(BTreeMap::new()),
                error_handlers: RwLock::new(BTreeMap::new()),
                delivered: Mutex::new(Delivered {
                    version: 0,
                    records: Arc::new(Vec::new()),
                }),
            }),
        }
    }

    /// 订阅快照，注册后立即以当前快照调用一次。
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[ServerRecord]) + Send + Sync + 'static,
    {
        let handler: SnapshotHandler = Arc::new(handler);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let delivered = lock(&self.inner.delivered);
        write(&self.inner.data_handlers).insert(id, handler.clone());
        invoke_guarded(|| handler(&delivered.records));
        drop(delivered);
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
            channel: Channel::Data,
        }
    }

    /// 订阅错误事件（无回放）。
    pub fn subscribe_to_errors<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        write(&self.inner.error_handlers).insert(id, Arc::new(handler));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
            channel: Channel::Errors,
        }
    }

    /// 发布快照。版本不新于已投递版本时丢弃并返回 `false`。
    pub fn publish_snapshot(&self, version: u64, records: Arc<Vec<ServerRecord>>) -> bool {
        let mut delivered = lock(&self.inner.delivered);
        if version <= delivered.version {
            return false;
        }
        delivered.version = version;
        delivered.records = records.clone();
        let handlers: Vec<SnapshotHandler> =
            read(&self.inner.data_handlers).values().cloned().collect();
        for handler in handlers {
            invoke_guarded(|| handler(&records));
        }
        record_snapshot_published();
        true
    }

    pub fn publish_error(&self, connection_id: &str, message: &str) {
        let handlers: Vec<ErrorHandler> =
            read(&self.inner.error_handlers).values().cloned().collect();
        for handler in handlers {
            invoke_guarded(|| handler(connection_id, message));
        }
        record_error_event_published();
    }

    /// 最近一次投递的快照。
    pub fn latest(&self) -> Arc<Vec<ServerRecord>> {
        lock(&self.inner.delivered).records.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        read(&self.inner.data_handlers).len() + read(&self.inner.error_handlers).len()
    }

    /// 移除全部订阅者。
    pub fn clear(&self) {
        write(&self.inner.data_handlers).clear();
        write(&self.inner.error_handlers).clear();
    }
}

fn invoke_guarded(call: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(call)).is_err() {
        record_handler_panic();
        warn!(target: "bmc.bus", "subscriber_panicked");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Data,
    Errors,
}

/// 订阅句柄。丢弃句柄不会取消订阅，需显式调用 [`Subscription::unsubscribe`]。
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
    channel: Channel,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        match self.channel {
            Channel::Data => {
                write(&bus.data_handlers).remove(&self.id);
            }
            Channel::Errors => {
                write(&bus.error_handlers).remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Hardware, Location, Metrics, ServerFields, ServerStatus, Specs};
    use std::collections::BTreeSet;

    fn record(id: &str) -> ServerRecord {
        ServerRecord {
            fields: ServerFields {
                id: id.to_string(),
                hostname: id.to_string(),
                bmc_address: "10.0.0.1".to_string(),
                management_type: "IPMI".to_string(),
                status: ServerStatus::Online,
                location: Location {
                    datacenter: "Unknown".to_string(),
                    rack: "Unknown".to_string(),
                    unit: 0,
                },
                hardware: Hardware {
                    manufacturer: "Unknown".to_string(),
                    model: "Unknown".to_string(),
                    serial_number: "Unknown".to_string(),
                    firmware_version: "Unknown".to_string(),
                },
                specs: Specs {
                    cpu: "Unknown".to_string(),
                    cpu_cores: 0,
                    memory: "0GB".to_string(),
                },
                storage: Vec::new(),
                network: Vec::new(),
                metrics: Metrics {
                    cpu_usage: 0.0,
                    memory_usage: 0.0,
                    temperature: 0.0,
                    fan_speed: 0,
                    power_consumption: 0.0,
                },
            },
            last_seen_at_ms: None,
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn subscribe_replays_current_snapshot() {
        let bus = NotificationBus::new();
        assert!(bus.publish_snapshot(1, Arc::new(vec![record("a")])));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = bus.subscribe(move |records| {
            sink.lock().expect("sink").push(records.len());
        });
        assert_eq!(*seen.lock().expect("seen"), vec![1]);
    }

    #[test]
    fn stale_snapshots_are_dropped() {
        let bus = NotificationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = bus.subscribe(move |records| {
            sink.lock().expect("sink").push(records.len());
        });

        assert!(bus.publish_snapshot(2, Arc::new(vec![record("a"), record("b")])));
        assert!(!bus.publish_snapshot(1, Arc::new(vec![record("a")])));
        assert_eq!(*seen.lock().expect("seen"), vec![0, 2]);
        assert_eq!(bus.latest().len(), 2);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let bus = NotificationBus::new();
        let _bad = bus.subscribe_to_errors(|_, _| panic!("boom"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _good = bus.subscribe_to_errors(move |id, message| {
            sink.lock()
                .expect("sink")
                .push(format!("{id}:{message}"));
        });

        bus.publish_error("conn-1", "redfish api error: 401 Unauthorized");
        assert_eq!(
            *seen.lock().expect("seen"),
            vec!["conn-1:redfish api error: 401 Unauthorized".to_string()]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let subscription = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.unsubscribe();
        bus.publish_snapshot(1, Arc::new(Vec::new()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
