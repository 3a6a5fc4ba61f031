//! Redfish 资源报文（DMTF Redfish 子集）。
//!
//! 只建模标准化和控制面会读取的字段。所有字段均可缺省，
//! 厂商实现缺少的字段不应导致整个报文解析失败。

use serde::{Deserialize, Serialize};

/// `{ "@odata.id": "..." }` 形式的资源链接。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ODataLink {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Status {
    pub state: Option<String>,
    pub health: Option<String>,
    pub health_rollup: Option<String>,
}

/// `/redfish/v1`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRoot {
    #[serde(rename = "@odata.id")]
    pub odata_id: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub redfish_version: Option<String>,
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,
    pub systems: Option<ODataLink>,
    pub chassis: Option<ODataLink>,
    pub managers: Option<ODataLink>,
}

/// 资源集合（Systems、Chassis、Processors、EthernetInterfaces）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Collection {
    #[serde(rename = "@odata.id")]
    pub odata_id: Option<String>,
    pub name: Option<String>,
    pub members: Vec<ODataLink>,
    #[serde(rename = "Members@odata.count")]
    pub members_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProcessorSummary {
    pub count: Option<u32>,
    pub model: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MemorySummary {
    #[serde(rename = "TotalSystemMemoryGiB")]
    pub total_system_memory_gib: Option<f64>,
    pub status: Option<Status>,
}

/// `/redfish/v1/Systems/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ComputerSystem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub part_number: Option<String>,
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,
    pub host_name: Option<String>,
    /// `On` / `Off` / `PoweringOn` / `PoweringOff`
    pub power_state: Option<String>,
    pub status: Option<Status>,
    pub bios_version: Option<String>,
    pub processor_summary: Option<ProcessorSummary>,
    pub memory_summary: Option<MemorySummary>,
    pub processors: Option<ODataLink>,
    pub storage: Option<ODataLink>,
    pub ethernet_interfaces: Option<ODataLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Placement {
    pub rack: Option<String>,
    pub row: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChassisLocation {
    pub placement: Option<Placement>,
}

/// `/redfish/v1/Chassis/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Chassis {
    pub id: Option<String>,
    pub name: Option<String>,
    pub chassis_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<Status>,
    pub location: Option<ChassisLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Temperature {
    pub member_id: Option<String>,
    pub name: Option<String>,
    pub reading_celsius: Option<f64>,
    pub physical_context: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Fan {
    pub member_id: Option<String>,
    pub name: Option<String>,
    pub reading: Option<f64>,
    /// `RPM` / `Percent`
    pub reading_units: Option<String>,
    pub physical_context: Option<String>,
    pub status: Option<Status>,
}

/// `/redfish/v1/Chassis/{id}/Thermal`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Thermal {
    pub id: Option<String>,
    pub temperatures: Vec<Temperature>,
    pub fans: Vec<Fan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PowerControl {
    pub member_id: Option<String>,
    pub name: Option<String>,
    pub power_consumed_watts: Option<f64>,
    pub power_capacity_watts: Option<f64>,
    pub status: Option<Status>,
}

/// `/redfish/v1/Chassis/{id}/Power`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Power {
    pub id: Option<String>,
    pub power_control: Vec<PowerControl>,
}

/// `/redfish/v1/Systems/{id}/Processors/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Processor {
    pub id: Option<String>,
    pub name: Option<String>,
    pub socket: Option<String>,
    pub processor_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "MaxSpeedMHz")]
    pub max_speed_mhz: Option<u32>,
    pub total_cores: Option<u32>,
    pub total_threads: Option<u32>,
    pub status: Option<Status>,
}

/// `/redfish/v1/Systems/1/Storage/{id}/Drives/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Drive {
    pub id: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub capacity_bytes: Option<u64>,
    /// `HDD` / `SSD` / `SMR`
    pub media_type: Option<String>,
    pub protocol: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Ipv4Address {
    pub address: Option<String>,
    pub subnet_mask: Option<String>,
    pub gateway: Option<String>,
}

/// `/redfish/v1/Systems/{id}/EthernetInterfaces/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EthernetInterface {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "MACAddress")]
    pub mac_address: Option<String>,
    pub speed_mbps: Option<u32>,
    pub link_status: Option<String>,
    pub status: Option<Status>,
    #[serde(rename = "IPv4Addresses")]
    pub ipv4_addresses: Vec<Ipv4Address>,
}
