#![allow(dead_code)]

use async_trait::async_trait;
use bmc_polling::BmcService;
use bmc_redfish::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ProxyConfig, RedfishError};
use bmc_storage::{BlobStore, InMemoryBlobStore, StorageError};
use domain::{ConnectionDraft, ConnectionKind, Scheme};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// 进程内模拟的多台 BMC：按目标主机返回报文，可注入失败与阻塞。
#[derive(Default)]
pub struct FakeBmc {
    failures: Mutex<HashMap<String, u16>>,
    unreachable: Mutex<Vec<String>>,
    power_states: Mutex<HashMap<String, (String, String)>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeBmc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 该主机的所有请求返回指定状态码。
    pub fn fail_with(&self, host: &str, status: u16) {
        self.failures
            .lock()
            .expect("failures")
            .insert(host.to_string(), status);
    }

    pub fn set_unreachable(&self, host: &str) {
        self.unreachable
            .lock()
            .expect("unreachable")
            .push(host.to_string());
    }

    pub fn recover(&self, host: &str) {
        self.failures.lock().expect("failures").remove(host);
        self.unreachable
            .lock()
            .expect("unreachable")
            .retain(|item| item != host);
    }

    pub fn set_power(&self, host: &str, power_state: &str, health: &str) {
        self.power_states.lock().expect("power").insert(
            host.to_string(),
            (power_state.to_string(), health.to_string()),
        );
    }

    /// 阻塞该主机的请求，直到 [`FakeBmc::release`]。
    pub fn hold(&self, host: &str) {
        self.holds
            .lock()
            .expect("holds")
            .insert(host.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, host: &str) {
        if let Some(semaphore) = self.holds.lock().expect("holds").remove(host) {
            semaphore.close();
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests").clone()
    }

    /// 对该主机发起的 `GET /redfish/v1/Systems/1` 次数（每个轮询周期一次）。
    pub fn system_fetches(&self, host: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| {
                request.method == HttpMethod::Get
                    && target_host(request) == host
                    && path_of(&request.url) == "/redfish/v1/Systems/1"
            })
            .count()
    }

    fn respond(&self, host: &str, path: &str) -> (u16, serde_json::Value) {
        let (power_state, health) = self
            .power_states
            .lock()
            .expect("power")
            .get(host)
            .cloned()
            .unwrap_or_else(|| ("On".to_string(), "OK".to_string()));
        match path {
            "/redfish/v1" => (200, serde_json::json!({ "RedfishVersion": "1.8.0" })),
            "/redfish/v1/Systems/1" => (
                200,
                serde_json::json!({
                    "PowerState": power_state,
                    "Status": { "Health": health },
                    "Manufacturer": "Dell Inc.",
                    "Model": "PowerEdge R740",
                    "SerialNumber": format!("SN-{host}"),
                    "HostName": format!("host-{host}"),
                    "BiosVersion": "2.12.2",
                    "ProcessorSummary": { "Count": 2, "Model": "Xeon Gold 6230" },
                    "MemorySummary": { "TotalSystemMemoryGiB": 256 }
                }),
            ),
            "/redfish/v1/Chassis/1" => (
                200,
                serde_json::json!({ "Location": { "Placement": { "Rack": "R1" } } }),
            ),
            "/redfish/v1/Chassis/1/Thermal" => (
                200,
                serde_json::json!({
                    "Temperatures": [
                        { "Name": "Inlet", "ReadingCelsius": 22 },
                        { "Name": "CPU1 Temp", "ReadingCelsius": 61 }
                    ],
                    "Fans": [ { "Reading": 4800 }, { "Reading": 5200 } ]
                }),
            ),
            "/redfish/v1/Chassis/1/Power" => (
                200,
                serde_json::json!({ "PowerControl": [ { "PowerConsumedWatts": 312 } ] }),
            ),
            "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset" => (204, serde_json::json!({})),
            _ => (404, serde_json::json!({})),
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

pub fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .find('/')
        .map(|index| &without_scheme[index..])
        .unwrap_or("/")
}

pub fn target_host(request: &HttpRequest) -> String {
    if let Some(host) = request.header("X-Target-Host") {
        return host.to_string();
    }
    let without_scheme = request
        .url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&request.url);
    let authority = without_scheme.split('/').next().unwrap_or_default();
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
        let host = target_host(&request);

        let hold = self.holds.lock().expect("holds").get(&host).cloned();
        if let Some(semaphore) = hold {
            let _permit = semaphore.acquire().await;
        }

        if self
            .unreachable
            .lock()
            .expect("unreachable")
            .contains(&host)
        {
            return Err(RedfishError::Transport(format!(
                "error sending request for url ({}): connection refused",
                request.url
            )));
        }
        let failure = self.failures.lock().expect("failures").get(&host).copied();
        let (status, body) = match failure {
            Some(status) => (status, serde_json::json!({})),
            None => self.respond(&host, path_of(&request.url)),
        };
        Ok(HttpResponse {
            status,
            reason: reason(status).to_string(),
            body: body.to_string().into_bytes(),
        })
    }
}

/// 读写都失败的存储。
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Unavailable("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk unavailable".to_string()))
    }
}

/// 写入前等待可调时长的存储（暂停时钟下模拟慢速后端）。
#[derive(Default)]
pub struct SlowStore {
    inner: InMemoryBlobStore,
    delay: Mutex<Duration>,
}

impl SlowStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("delay") = delay;
    }
}

#[async_trait]
impl BlobStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let delay = *self.delay.lock().expect("delay");
        tokio::time::sleep(delay).await;
        self.inner.set(key, value).await
    }
}

pub fn direct() -> ProxyConfig {
    ProxyConfig {
        proxy_url: "http://localhost:8443".to_string(),
        enabled: false,
    }
}

pub fn draft(name: &str, host: &str, interval: u64, enabled: bool) -> ConnectionDraft {
    ConnectionDraft {
        name: name.to_string(),
        host: host.to_string(),
        port: 443,
        protocol: Scheme::Https,
        username: "root".to_string(),
        secret: "calvin".to_string(),
        kind: ConnectionKind::Idrac,
        enabled,
        poll_interval_seconds: interval,
    }
}

pub fn service(bmc: &Arc<FakeBmc>) -> (BmcService, Arc<InMemoryBlobStore>) {
    let store = Arc::new(InMemoryBlobStore::new());
    let service = BmcService::new(bmc.clone(), store.clone(), direct());
    (service, store)
}

/// 让已派生的任务跑完（暂停时钟下只推进极短的虚拟时间）。
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
