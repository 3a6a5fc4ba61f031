//! Redfish 报文 -> 规范化服务器记录。
//!
//! 纯函数，无 I/O：同样的输入总是得到同样的输出。
//! 合并规则（成功 / 失败轮询如何作用于已有记录）见 [`merge_success`] 与 [`merge_failure`]。

use domain::redfish::{Chassis, ComputerSystem, Power, Thermal};
use domain::{
    Connection, ConnectionKind, Hardware, Location, Metrics, ServerFields, ServerRecord,
    ServerStatus, Specs,
};
use std::collections::BTreeSet;

const UNKNOWN: &str = "Unknown";

/// 一次轮询取回的四个资源。
#[derive(Debug, Clone, Default)]
pub struct RedfishDocuments {
    pub system: ComputerSystem,
    pub chassis: Chassis,
    pub thermal: Thermal,
    pub power: Power,
}

/// 状态推导，按优先级：
/// 1. `PowerState == Off` -> offline
/// 2. `Health == Critical` -> offline
/// 3. `Health == Warning` -> warning
/// 4. `PowerState == On` -> online
/// 5. 其他 -> maintenance
pub fn derive_status(system: &ComputerSystem) -> ServerStatus {
    let power_state = system.power_state.as_deref();
    let health = system
        .status
        .as_ref()
        .and_then(|status| status.health.as_deref());

    if power_state == Some("Off") {
        return ServerStatus::Offline;
    }
    match health {
        Some("Critical") => ServerStatus::Offline,
        Some("Warning") => ServerStatus::Warning,
        _ if power_state == Some("On") => ServerStatus::Online,
        _ => ServerStatus::Maintenance,
    }
}

/// CPU 温度：物理位置或名称包含 "cpu"（不区分大小写）的第一条读数，缺失为 0。
pub fn cpu_temperature(thermal: &Thermal) -> f64 {
    thermal
        .temperatures
        .iter()
        .find(|reading| {
            contains_cpu(reading.physical_context.as_deref())
                || contains_cpu(reading.name.as_deref())
        })
        .and_then(|reading| reading.reading_celsius)
        .unwrap_or(0.0)
}

fn contains_cpu(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.to_ascii_lowercase().contains("cpu"))
}

/// 所有风扇读数的算术平均（缺失读数按 0 计），四舍五入；无风扇为 0。
pub fn average_fan_speed(thermal: &Thermal) -> u32 {
    if thermal.fans.is_empty() {
        return 0;
    }
    let total: f64 = thermal
        .fans
        .iter()
        .map(|fan| fan.reading.unwrap_or(0.0))
        .sum();
    let average = (total / thermal.fans.len() as f64).round();
    if average <= 0.0 { 0 } else { average as u32 }
}

/// 第一个 PowerControl 的 `PowerConsumedWatts`，缺失为 0。
pub fn power_consumption(power: &Power) -> f64 {
    power
        .power_control
        .first()
        .and_then(|control| control.power_consumed_watts)
        .unwrap_or(0.0)
}

pub fn management_type(kind: ConnectionKind) -> &'static str {
    match kind {
        ConnectionKind::Idrac => "iDRAC",
        ConnectionKind::Ilo => "iLO",
        ConnectionKind::Redfish | ConnectionKind::IpmiViaRedfish => "IPMI",
    }
}

/// 取第一个非空值，全部缺失时为 "Unknown"。
fn first_known(candidates: &[Option<&String>]) -> String {
    candidates
        .iter()
        .flatten()
        .find(|value| !value.is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// 四个资源 + 连接元数据 -> 规范化字段。
pub fn normalize(documents: &RedfishDocuments, connection: &Connection) -> ServerFields {
    let RedfishDocuments {
        system,
        chassis,
        thermal,
        power,
    } = documents;

    let rack = chassis
        .location
        .as_ref()
        .and_then(|location| location.placement.as_ref())
        .and_then(|placement| placement.rack.as_ref());
    let summary = system.processor_summary.as_ref();
    let memory_gib = system
        .memory_summary
        .as_ref()
        .and_then(|memory| memory.total_system_memory_gib)
        .unwrap_or(0.0);

    ServerFields {
        id: connection.id.clone(),
        hostname: first_known(&[system.host_name.as_ref(), Some(&connection.name)]),
        bmc_address: connection.host.clone(),
        management_type: management_type(connection.kind).to_string(),
        status: derive_status(system),
        location: Location {
            datacenter: UNKNOWN.to_string(),
            rack: first_known(&[rack]),
            unit: 0,
        },
        hardware: Hardware {
            manufacturer: first_known(&[
                system.manufacturer.as_ref(),
                chassis.manufacturer.as_ref(),
            ]),
            model: first_known(&[system.model.as_ref(), chassis.model.as_ref()]),
            serial_number: first_known(&[
                system.serial_number.as_ref(),
                chassis.serial_number.as_ref(),
            ]),
            firmware_version: first_known(&[system.bios_version.as_ref()]),
        },
        specs: Specs {
            cpu: first_known(&[summary.and_then(|summary| summary.model.as_ref())]),
            cpu_cores: summary.and_then(|summary| summary.count).unwrap_or(0),
            memory: format!("{}GB", memory_gib),
        },
        storage: Vec::new(),
        network: Vec::new(),
        metrics: Metrics {
            cpu_usage: 0.0,
            memory_usage: 0.0,
            temperature: cpu_temperature(thermal),
            fan_speed: average_fan_speed(thermal),
            power_consumption: power_consumption(power),
        },
    }
}

fn seed_tags(connection: &Connection) -> BTreeSet<String> {
    BTreeSet::from([connection.kind.as_str().to_string()])
}

/// 成功轮询：字段整体替换，保留已有标签（首次由 kind 生成），`last_seen` 推进到 `now_ms`。
pub fn merge_success(
    previous: Option<&ServerRecord>,
    fields: ServerFields,
    connection: &Connection,
    now_ms: i64,
) -> ServerRecord {
    let tags = match previous {
        Some(previous) => previous.tags.clone(),
        None => seed_tags(connection),
    };
    ServerRecord {
        fields,
        last_seen_at_ms: Some(now_ms),
        tags,
    }
}

/// 失败轮询：保留上次已知的全部字段，只把状态强制为 offline，`last_seen` 不推进。
///
/// 尚无记录时生成占位记录（身份取自连接，硬件为 "Unknown"，指标为 0，无 `last_seen`）。
pub fn merge_failure(previous: Option<&ServerRecord>, connection: &Connection) -> ServerRecord {
    match previous {
        Some(previous) => {
            let mut record = previous.clone();
            record.fields.status = ServerStatus::Offline;
            record
        }
        None => {
            let mut fields = normalize(&RedfishDocuments::default(), connection);
            fields.status = ServerStatus::Offline;
            ServerRecord {
                fields,
                last_seen_at_ms: None,
                tags: seed_tags(connection),
            }
        }
    }
}
