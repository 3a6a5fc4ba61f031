//! 测试共用：进程内模拟 BMC、服务构造与 HTTP 调用辅助。

use crate::{AppState, build_app};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bmc_polling::BmcService;
use bmc_redfish::{HttpRequest, HttpResponse, HttpTransport, ProxyConfig, RedfishError};
use bmc_storage::InMemoryBlobStore;
use domain::{ConnectionDraft, ConnectionKind, Scheme};
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// 按目标主机应答的模拟 BMC。
#[derive(Default)]
pub struct FakeBmc {
    failures: Mutex<HashMap<String, u16>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeBmc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, host: &str, status: u16) {
        self.failures
            .lock()
            .expect("failures")
            .insert(host.to_string(), status);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests").clone()
    }
}

fn host_of(request: &HttpRequest) -> String {
    if let Some(host) = request.header("X-Target-Host") {
        return host.to_string();
    }
    let rest = request
        .url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&request.url);
    let authority = rest.split('/').next().unwrap_or_default();
    authority
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(authority)
        .to_string()
}

#[async_trait]
impl HttpTransport for FakeBmc {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RedfishError> {
        self.requests
            .lock()
            .expect("requests")
            .push(request.clone());
        let host = host_of(&request);
        if let Some(status) = self.failures.lock().expect("failures").get(&host).copied() {
            let reason = match status {
                401 => "Unauthorized",
                500 => "Internal Server Error",
                _ => "Error",
            };
            return Ok(HttpResponse {
                status,
                reason: reason.to_string(),
                body: b"{}".to_vec(),
            });
        }
        let path = request
            .url
            .split_once("/redfish/v1")
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        let body = match path {
            "" => serde_json::json!({ "RedfishVersion": "1.11.0" }),
            "/Systems/1" => serde_json::json!({
                "PowerState": "On",
                "Status": { "Health": "OK" },
                "Manufacturer": "HPE",
                "Model": "ProLiant DL380 Gen10",
                "HostName": format!("host-{host}"),
                "MemorySummary": { "TotalSystemMemoryGiB": 128 }
            }),
            "/Chassis/1/Power" => serde_json::json!({
                "PowerControl": [ { "PowerConsumedWatts": 250 } ]
            }),
            "/Systems/1/Actions/ComputerSystem.Reset" => {
                return Ok(HttpResponse {
                    status: 204,
                    reason: "No Content".to_string(),
                    body: Vec::new(),
                });
            }
            _ => serde_json::json!({}),
        };
        Ok(HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            body: body.to_string().into_bytes(),
        })
    }
}

pub fn service_with(bmc: Arc<FakeBmc>) -> BmcService {
    BmcService::new(
        bmc,
        Arc::new(InMemoryBlobStore::new()),
        ProxyConfig {
            proxy_url: "http://localhost:8443".to_string(),
            enabled: false,
        },
    )
}

pub fn draft(name: &str, host: &str, enabled: bool) -> ConnectionDraft {
    ConnectionDraft {
        name: name.to_string(),
        host: host.to_string(),
        port: 443,
        protocol: Scheme::Https,
        username: "Administrator".to_string(),
        secret: "secret-pw".to_string(),
        kind: ConnectionKind::Ilo,
        enabled,
        poll_interval_seconds: 30,
    }
}

/// 发起一次请求，返回状态码与 JSON 响应体。
pub async fn call(
    service: &BmcService,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let app = build_app(AppState {
        service: service.clone(),
    });
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
