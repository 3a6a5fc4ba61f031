//! Redfish 客户端
//!
//! 每个连接构造一个客户端，调用之间不保留状态，不做重试：
//! 重试策略属于调用方（调度器只在下一次 tick 再试）。

use crate::error::RedfishError;
use crate::routing::Routing;
use crate::transport::{HttpMethod, HttpRequest, HttpTransport};
use base64::{Engine as _, engine::general_purpose};
use bmc_normalize::RedfishDocuments;
use domain::redfish::{
    Chassis, Collection, ComputerSystem, Drive, EthernetInterface, Power, Processor, ServiceRoot,
    Thermal,
};
use domain::{Connection, ServerFields};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub const API_ROOT: &str = "/redfish/v1";
/// 单系统 / 单机箱 BMC 的默认资源 ID。
pub const DEFAULT_RESOURCE_ID: &str = "1";

/// 电源操作，对应 `ComputerSystem.Reset` 的 `ResetType`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    On,
    ForceOff,
    ForceRestart,
    GracefulShutdown,
}

impl PowerAction {
    pub fn reset_type(&self) -> &'static str {
        match self {
            PowerAction::On => "On",
            PowerAction::ForceOff => "ForceOff",
            PowerAction::ForceRestart => "ForceRestart",
            PowerAction::GracefulShutdown => "GracefulShutdown",
        }
    }
}

/// 单个 BMC 的 Redfish 客户端。
#[derive(Clone)]
pub struct RedfishClient {
    connection: Connection,
    routing: Routing,
    auth_header: String,
    transport: Arc<dyn HttpTransport>,
}

impl RedfishClient {
    pub fn new(
        connection: &Connection,
        routing: Routing,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let credentials = format!("{}:{}", connection.username, connection.secret);
        let auth_header = format!("Basic {}", general_purpose::STANDARD.encode(credentials));
        Self {
            connection: connection.clone(),
            routing,
            auth_header,
            transport,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn build_request(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> HttpRequest {
        let (url, forward_headers) = self.routing.resolve(&self.connection, path);
        let mut headers = vec![
            ("Authorization".to_string(), self.auth_header.clone()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        headers.extend(forward_headers);
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RedfishError> {
        let request = self.build_request(HttpMethod::Get, path, None);
        let started = Instant::now();
        let response = self.transport.send(request).await?;
        debug!(
            target: "bmc.redfish",
            connection_id = %self.connection.id,
            host = %self.connection.host,
            path = %path,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "redfish_get"
        );
        if !response.is_success() {
            return Err(RedfishError::Protocol {
                status: response.status,
                reason: response.reason,
            });
        }
        serde_json::from_slice(&response.body).map_err(|err| RedfishError::Decode(err.to_string()))
    }

    pub async fn get_root(&self) -> Result<ServiceRoot, RedfishError> {
        self.get(API_ROOT).await
    }

    pub async fn get_systems(&self) -> Result<Collection, RedfishError> {
        self.get(&format!("{API_ROOT}/Systems")).await
    }

    pub async fn get_system(&self, system_id: &str) -> Result<ComputerSystem, RedfishError> {
        self.get(&format!("{API_ROOT}/Systems/{system_id}")).await
    }

    /// 机箱集合。
    pub async fn get_chassis(&self) -> Result<Collection, RedfishError> {
        self.get(&format!("{API_ROOT}/Chassis")).await
    }

    pub async fn get_chassis_by_id(&self, chassis_id: &str) -> Result<Chassis, RedfishError> {
        self.get(&format!("{API_ROOT}/Chassis/{chassis_id}")).await
    }

    pub async fn get_thermal(&self, chassis_id: &str) -> Result<Thermal, RedfishError> {
        self.get(&format!("{API_ROOT}/Chassis/{chassis_id}/Thermal")).await
    }

    pub async fn get_power(&self, chassis_id: &str) -> Result<Power, RedfishError> {
        self.get(&format!("{API_ROOT}/Chassis/{chassis_id}/Power")).await
    }

    pub async fn get_processors(&self, system_id: &str) -> Result<Collection, RedfishError> {
        self.get(&format!("{API_ROOT}/Systems/{system_id}/Processors")).await
    }

    pub async fn get_processor(
        &self,
        system_id: &str,
        processor_id: &str,
    ) -> Result<Processor, RedfishError> {
        self.get(&format!("{API_ROOT}/Systems/{system_id}/Processors/{processor_id}")).await
    }

    pub async fn get_ethernet_interfaces(
        &self,
        system_id: &str,
    ) -> Result<Collection, RedfishError> {
        self.get(&format!("{API_ROOT}/Systems/{system_id}/EthernetInterfaces")).await
    }

    pub async fn get_ethernet_interface(
        &self,
        system_id: &str,
        interface_id: &str,
    ) -> Result<EthernetInterface, RedfishError> {
        self.get(&format!(
            "{API_ROOT}/Systems/{system_id}/EthernetInterfaces/{interface_id}"
        ))
        .await
    }

    /// 驱动器固定挂在系统 1 下。
    pub async fn get_drive(&self, storage_id: &str, drive_id: &str) -> Result<Drive, RedfishError> {
        self.get(&format!(
            "{API_ROOT}/Systems/{DEFAULT_RESOURCE_ID}/Storage/{storage_id}/Drives/{drive_id}"
        ))
        .await
    }

    /// 并发取回 System / Chassis / Thermal / Power，四个都完成后再标准化。
    /// 任一失败则整体失败。
    pub async fn fetch_documents(&self) -> Result<RedfishDocuments, RedfishError> {
        let (system, chassis, thermal, power) = tokio::join!(
            self.get_system(DEFAULT_RESOURCE_ID),
            self.get_chassis_by_id(DEFAULT_RESOURCE_ID),
            self.get_thermal(DEFAULT_RESOURCE_ID),
            self.get_power(DEFAULT_RESOURCE_ID),
        );
        Ok(RedfishDocuments {
            system: system?,
            chassis: chassis?,
            thermal: thermal?,
            power: power?,
        })
    }

    pub async fn fetch_canonical_snapshot(&self) -> Result<ServerFields, RedfishError> {
        let documents = self.fetch_documents().await?;
        Ok(bmc_normalize::normalize(&documents, &self.connection))
    }

    async fn post_reset(&self, system_id: &str, action: PowerAction) -> Result<(), RedfishError> {
        let path = format!("{API_ROOT}/Systems/{system_id}/Actions/ComputerSystem.Reset");
        let body = serde_json::to_vec(&serde_json::json!({ "ResetType": action.reset_type() }))
            .map_err(|err| RedfishError::Decode(err.to_string()))?;
        let request = self.build_request(HttpMethod::Post, &path, Some(body));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(RedfishError::Action {
                reset_type: action.reset_type().to_string(),
                status: response.status,
                reason: response.reason,
            });
        }
        Ok(())
    }

    pub async fn power_action(
        &self,
        system_id: &str,
        action: PowerAction,
    ) -> Result<(), RedfishError> {
        self.post_reset(system_id, action).await
    }

    pub async fn power_on(&self) -> Result<(), RedfishError> {
        self.post_reset(DEFAULT_RESOURCE_ID, PowerAction::On).await
    }

    pub async fn power_off(&self) -> Result<(), RedfishError> {
        self.post_reset(DEFAULT_RESOURCE_ID, PowerAction::ForceOff).await
    }

    pub async fn power_reset(&self) -> Result<(), RedfishError> {
        self.post_reset(DEFAULT_RESOURCE_ID, PowerAction::ForceRestart).await
    }

    pub async fn graceful_shutdown(&self) -> Result<(), RedfishError> {
        self.post_reset(DEFAULT_RESOURCE_ID, PowerAction::GracefulShutdown).await
    }
}
