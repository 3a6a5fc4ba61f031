//! # Redfish 协议客户端
//!
//! ```text
//! Connection + ProxyConfig
//!       │
//!       ▼
//! RedfishClient ── Routing::{Direct, Proxy} ──> URL + 转发头
//!       │
//!       ▼
//! HttpTransport (ReqwestTransport / 测试脚本)
//!       │
//!       ▼
//! 报文 (domain::redfish) ──> bmc_normalize::normalize
//! ```
//!
//! 所有请求携带 `Authorization: Basic ...`、`Accept: application/json`。
//! 非 2xx 返回 [`RedfishError::Protocol`]，拿不到响应返回 [`RedfishError::Transport`]。

mod client;
mod error;
mod routing;
mod transport;

pub use client::{API_ROOT, DEFAULT_RESOURCE_ID, PowerAction, RedfishClient};
pub use error::RedfishError;
pub use routing::{DEFAULT_PROXY_URL, ProxyConfig, Routing};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, ReqwestTransportConfig,
};
