//! # BMC 轮询核心
//!
//! ```text
//! 调用方 ──> ConnectionRegistry (增删改查, 持久化)
//!                │  enabled / 间隔变化
//!                ▼
//!          PollingScheduler (每连接一个定时任务)
//!                │  tick
//!                ▼
//!          RedfishClient ──> bmc_normalize ──> 合并记录
//!                │
//!                ▼
//!          NotificationBus (快照 / 错误) ──> 订阅者
//! ```
//!
//! [`BmcService`] 把以上组件组装为一个实例，是唯一的对外入口。

mod bus;
mod error;
mod lock;
mod registry;
mod scheduler;
mod service;

pub use bus::{ErrorHandler, NotificationBus, SnapshotHandler, Subscription};
pub use error::PollerError;
pub use registry::{CONNECTIONS_KEY, ConnectionRegistry, UpdateOutcome};
pub use scheduler::{PollOutcome, PollSummary, PollingScheduler, TEST_CONNECTION_ID, TestOutcome};
pub use service::{BmcService, PROXY_KEY};
