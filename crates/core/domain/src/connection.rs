//! BMC 连接配置（用户录入、持久化）。
//!
//! `last_polled_at_ms` 与 `last_error` 只由轮询调度写入，
//! 调用方只能通过 [`ConnectionDraft`] 创建、通过 [`ConnectionPatch`] 局部更新。

use serde::{Deserialize, Serialize};

/// 访问 BMC 的 URL scheme。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BMC 类型，只影响标准化提示（管理类型、初始标签），不影响传输方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    #[serde(rename = "redfish")]
    Redfish,
    #[serde(rename = "idrac")]
    Idrac,
    #[serde(rename = "ilo")]
    Ilo,
    #[serde(rename = "ipmi-via-redfish", alias = "ipmi")]
    IpmiViaRedfish,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Redfish => "redfish",
            ConnectionKind::Idrac => "idrac",
            ConnectionKind::Ilo => "ilo",
            ConnectionKind::IpmiViaRedfish => "ipmi-via-redfish",
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已登记的 BMC 连接。
///
/// 序列化字段名即持久化格式（JSON 数组中的一项）。
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Scheme,
    pub username: String,
    /// 明文凭据（持久化层无加密）。
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(alias = "type")]
    pub kind: ConnectionKind,
    pub enabled: bool,
    #[serde(alias = "pollInterval")]
    pub poll_interval_seconds: u64,
    #[serde(rename = "lastPolledAt", default, skip_serializing_if = "Option::is_none")]
    pub last_polled_at_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Connection {
    /// 由草稿和新分配的 ID 构造连接；调度字段为空。
    pub fn from_draft(id: impl Into<String>, draft: ConnectionDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            host: draft.host,
            port: draft.port,
            protocol: draft.protocol,
            username: draft.username,
            secret: draft.secret,
            kind: draft.kind,
            enabled: draft.enabled,
            poll_interval_seconds: draft.poll_interval_seconds,
            last_polled_at_ms: None,
            last_error: None,
        }
    }

    /// `protocol://host:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// 应用局部更新，返回是否影响调度（enabled 或轮询间隔发生变化）。
    pub fn apply(&mut self, patch: ConnectionPatch) -> bool {
        let before = (self.enabled, self.poll_interval_seconds);
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(host) = patch.host {
            self.host = host;
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(protocol) = patch.protocol {
            self.protocol = protocol;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(secret) = patch.secret {
            self.secret = secret;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(interval) = patch.poll_interval_seconds {
            self.poll_interval_seconds = interval;
        }
        before != (self.enabled, self.poll_interval_seconds)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("last_polled_at_ms", &self.last_polled_at_ms)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// 创建连接的输入（不含 ID 与调度字段）。
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDraft {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Scheme,
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(alias = "type")]
    pub kind: ConnectionKind,
    pub enabled: bool,
    #[serde(alias = "pollInterval")]
    pub poll_interval_seconds: u64,
}

impl ConnectionDraft {
    /// 端口必须在 1..=65535，轮询间隔必须为正整数。
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host required".to_string());
        }
        if self.port == 0 {
            return Err("port must be within 1..=65535".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("pollIntervalSeconds must be positive".to_string());
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDraft")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .finish()
    }
}

/// 连接的局部更新，`None` 表示保持原值。
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<Scheme>,
    pub username: Option<String>,
    #[serde(alias = "password")]
    pub secret: Option<String>,
    #[serde(alias = "type")]
    pub kind: Option<ConnectionKind>,
    pub enabled: Option<bool>,
    #[serde(alias = "pollInterval")]
    pub poll_interval_seconds: Option<u64>,
}

impl std::fmt::Debug for ConnectionPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPatch")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .finish()
    }
}

impl ConnectionPatch {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.port, Some(0)) {
            return Err("port must be within 1..=65535".to_string());
        }
        if matches!(self.poll_interval_seconds, Some(0)) {
            return Err("pollIntervalSeconds must be positive".to_string());
        }
        if matches!(self.host.as_deref(), Some(host) if host.trim().is_empty()) {
            return Err("host required".to_string());
        }
        Ok(())
    }
}
