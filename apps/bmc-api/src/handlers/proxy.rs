//! 转发代理设置 handlers
//!
//! - GET /api/proxy
//! - PUT /api/proxy - 省略的字段保持不变，下一次请求起生效

use crate::AppState;
use crate::utils::{normalize_optional, ok};
use api_contract::{ProxySettingsDto, UpdateProxyRequest};
use axum::{Json, extract::State, response::Response};
use bmc_redfish::ProxyConfig;

fn to_dto(config: ProxyConfig) -> ProxySettingsDto {
    ProxySettingsDto {
        proxy_url: config.proxy_url,
        enabled: config.enabled,
    }
}

pub async fn get_proxy(State(state): State<AppState>) -> Response {
    ok(to_dto(state.service.proxy_config()))
}

pub async fn update_proxy(
    State(state): State<AppState>,
    Json(req): Json<UpdateProxyRequest>,
) -> Response {
    let proxy_url = match normalize_optional(req.proxy_url, "proxyUrl") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let current = state.service.proxy_config();
    let next = ProxyConfig {
        proxy_url: proxy_url.unwrap_or(current.proxy_url),
        enabled: req.enabled.unwrap_or(current.enabled),
    };
    ok(to_dto(state.service.configure_proxy(next).await))
}
