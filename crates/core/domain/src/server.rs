//! 规范化后的服务器记录（内存态，不持久化）。
//!
//! 每次成功轮询都会重建 [`ServerFields`]；`tags` 与 `last_seen_at_ms`
//! 由合并规则维护，见 `bmc-normalize`。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// 服务器状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    Warning,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub datacenter: String,
    pub rack: String,
    pub unit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hardware {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specs {
    pub cpu: String,
    pub cpu_cores: u32,
    /// 形如 `"256GB"`。
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDevice {
    pub name: String,
    pub capacity_bytes: u64,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub mac_address: String,
    pub speed_mbps: u32,
}

/// 实时指标。CPU/内存使用率无法从 Redfish 获取，恒为 0。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// 摄氏度。
    pub temperature: f64,
    /// 风扇读数平均值（四舍五入）。
    pub fan_speed: u32,
    /// 瓦特。
    pub power_consumption: f64,
}

/// 由单次轮询结果推导出的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFields {
    /// 所属连接 ID。
    pub id: String,
    pub hostname: String,
    pub bmc_address: String,
    pub management_type: String,
    pub status: ServerStatus,
    pub location: Location,
    pub hardware: Hardware,
    pub specs: Specs,
    pub storage: Vec<StorageDevice>,
    pub network: Vec<NetworkInterface>,
    pub metrics: Metrics,
}

/// 对外发布的服务器记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    #[serde(flatten)]
    pub fields: ServerFields,
    /// 最近一次成功轮询时间；失败轮询不推进。
    #[serde(rename = "lastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at_ms: Option<i64>,
    pub tags: BTreeSet<String>,
}

impl ServerRecord {
    pub fn id(&self) -> &str {
        &self.fields.id
    }

    pub fn status(&self) -> ServerStatus {
        self.fields.status
    }
}
