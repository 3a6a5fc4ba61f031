pub mod connection;
pub mod redfish;
pub mod server;

pub use connection::{Connection, ConnectionDraft, ConnectionKind, ConnectionPatch, Scheme};
pub use server::{
    Hardware, Location, Metrics, NetworkInterface, ServerFields, ServerRecord, ServerStatus,
    Specs, StorageDevice,
};

/// 当前时间（毫秒时间戳）。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
