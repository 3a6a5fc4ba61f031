//! 稳定的 DTO 与 API 响应契约。
//!
//! 请求/响应字段统一 camelCase；连接凭据只进不出。

use domain::{Connection, ConnectionKind, Scheme, ServerFields, ServerRecord};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 连接返回结构（不含凭据）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDto {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Scheme,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub enabled: bool,
    pub poll_interval_seconds: u64,
    pub last_polled_at: Option<i64>,
    pub last_error: Option<String>,
}

impl From<Connection> for ConnectionDto {
    fn from(connection: Connection) -> Self {
        Self {
            id: connection.id,
            name: connection.name,
            host: connection.host,
            port: connection.port,
            protocol: connection.protocol,
            username: connection.username,
            kind: connection.kind,
            enabled: connection.enabled,
            poll_interval_seconds: connection.poll_interval_seconds,
            last_polled_at: connection.last_polled_at_ms,
            last_error: connection.last_error,
        }
    }
}

/// 连接创建 / 测试请求体。省略的字段由调用层补默认值。
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionRequest {
    pub name: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub protocol: Option<Scheme>,
    pub username: String,
    #[serde(alias = "secret")]
    pub password: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<ConnectionKind>,
    pub enabled: Option<bool>,
    #[serde(alias = "pollInterval")]
    pub poll_interval_seconds: Option<u64>,
}

/// 连接局部更新请求体。
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateConnectionRequest {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<Scheme>,
    pub username: Option<String>,
    #[serde(alias = "secret")]
    pub password: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<ConnectionKind>,
    pub enabled: Option<bool>,
    #[serde(alias = "pollInterval")]
    pub poll_interval_seconds: Option<u64>,
}

/// 连接测试结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<ServerFields>,
}

/// 单连接手动轮询结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultDto {
    pub connection_id: String,
    /// `succeeded` / `failed` / `discarded`
    pub outcome: String,
    pub error: Option<String>,
    pub server: Option<ServerRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollFailureDto {
    pub connection_id: String,
    pub error: String,
}

/// 全量轮询汇总。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummaryDto {
    pub succeeded: Vec<String>,
    pub failed: Vec<PollFailureDto>,
}

/// 电源操作请求体：`on` / `off` / `reset` / `gracefulShutdown`。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerActionRequest {
    pub action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerActionResponse {
    pub connection_id: String,
    pub reset_type: String,
}

/// 转发代理设置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettingsDto {
    pub proxy_url: String,
    pub enabled: bool,
}

/// 转发代理设置更新，省略的字段保持不变。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProxyRequest {
    pub proxy_url: Option<String>,
    pub enabled: Option<bool>,
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub ok: bool,
    pub connections: usize,
    pub scheduled: usize,
}

/// 指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
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
