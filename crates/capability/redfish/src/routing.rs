//! 直连 / 转发代理路由
//!
//! 代理模式下请求发往代理地址，真实目标通过
//! `X-Target-Host` / `X-Target-Port` / `X-Target-Protocol` 传递，
//! 一个代理实例即可转发到任意多个 BMC。

use domain::Connection;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROXY_URL: &str = "http://localhost:8443";

/// 转发代理设置（运行期可修改并持久化）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub proxy_url: String,
    pub enabled: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            enabled: true,
        }
    }
}

impl ProxyConfig {
    pub fn routing(&self) -> Routing {
        if self.enabled {
            Routing::Proxy {
                base_url: self.proxy_url.trim_end_matches('/').to_string(),
            }
        } else {
            Routing::Direct
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    Direct,
    Proxy { base_url: String },
}

impl Routing {
    /// 解析目标 URL 与额外转发头。
    pub fn resolve(&self, connection: &Connection, path: &str) -> (String, Vec<(String, String)>) {
        match self {
            Routing::Direct => (format!("{}{}", connection.base_url(), path), Vec::new()),
            Routing::Proxy { base_url } => (
                format!("{}{}", base_url, path),
                vec![
                    ("X-Target-Host".to_string(), connection.host.clone()),
                    ("X-Target-Port".to_string(), connection.port.to_string()),
                    (
                        "X-Target-Protocol".to_string(),
                        connection.protocol.to_string(),
                    ),
                ],
            ),
        }
    }
}
