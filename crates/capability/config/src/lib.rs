//! 应用运行配置加载。
//!
//! 所有变量均有默认值；数值格式错误时启动失败。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 连接配置的存储后端。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    File { dir: String },
    Redis { url: String },
}

/// 应用运行配置。
#[derive(Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub storage: StorageBackend,
    pub storage_namespace: String,
    pub proxy_url: String,
    pub proxy_enabled: bool,
    pub http_timeout_seconds: u64,
    pub tls_insecure: bool,
    pub mqtt_forward: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_qos: u8,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("http_addr", &self.http_addr)
            .field("storage", &self.storage)
            .field("storage_namespace", &self.storage_namespace)
            .field("proxy_url", &self.proxy_url)
            .field("proxy_enabled", &self.proxy_enabled)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("tls_insecure", &self.tls_insecure)
            .field("mqtt_forward", &self.mqtt_forward)
            .field("mqtt_host", &self.mqtt_host)
            .field("mqtt_port", &self.mqtt_port)
            .field("mqtt_username", &self.mqtt_username)
            .field("mqtt_password", &self.mqtt_password.as_ref().map(|_| "<redacted>"))
            .field("mqtt_topic_prefix", &self.mqtt_topic_prefix)
            .field("mqtt_qos", &self.mqtt_qos)
            .finish()
    }
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("BMC_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let storage = match read_optional("BMC_REDIS_URL") {
            Some(url) => StorageBackend::Redis { url },
            None => StorageBackend::File {
                dir: env::var("BMC_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            },
        };
        let storage_namespace =
            env::var("BMC_STORAGE_NAMESPACE").unwrap_or_else(|_| "bmc".to_string());
        let proxy_url =
            env::var("BMC_PROXY_URL").unwrap_or_else(|_| "http://localhost:8443".to_string());
        let proxy_enabled = read_bool_with_default("BMC_PROXY_ENABLED", true);
        let http_timeout_seconds = read_u64_with_default("BMC_HTTP_TIMEOUT_SECONDS", 30)?;
        let tls_insecure = read_bool_with_default("BMC_TLS_INSECURE", true);
        let mqtt_forward = read_bool_with_default("BMC_MQTT_FORWARD", false);
        let mqtt_host = env::var("BMC_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("BMC_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("BMC_MQTT_USERNAME");
        let mqtt_password = read_optional("BMC_MQTT_PASSWORD");
        if mqtt_username.is_some() && mqtt_password.is_none() {
            return Err(ConfigError::Missing("BMC_MQTT_PASSWORD".to_string()));
        }
        let mqtt_topic_prefix =
            env::var("BMC_MQTT_TOPIC_PREFIX").unwrap_or_else(|_| "bmc".to_string());
        let mqtt_qos = read_u8_with_default("BMC_MQTT_QOS", 1)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "BMC_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            storage,
            storage_namespace,
            proxy_url,
            proxy_enabled,
            http_timeout_seconds,
            tls_insecure,
            mqtt_forward,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_qos,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
