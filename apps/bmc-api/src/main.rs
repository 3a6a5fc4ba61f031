//! BMC 轮询服务进程：HTTP 控制面 + 可选 MQTT 事件转发。

mod forward;
mod handlers;
mod middleware;
mod routes;
#[cfg(test)]
mod test_support;
mod utils;

use axum::{Router, middleware as axum_middleware};
use bmc_config::{AppConfig, StorageBackend};
use bmc_polling::BmcService;
use bmc_redfish::{ProxyConfig, ReqwestTransport, ReqwestTransportConfig};
use bmc_storage::{BlobStore, FileBlobStore, RedisBlobStore};
use bmc_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: BmcService,
}

/// 组装完整路由：根路径的健康检查与指标，业务接口挂在 `/api` 下。
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_system_router())
        .nest("/api", routes::create_api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(axum_middleware::from_fn(middleware::request_context))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();
    info!(target: "bmc.api", config = ?config, "config_loaded");

    let store: Arc<dyn BlobStore> = match &config.storage {
        StorageBackend::File { dir } => {
            Arc::new(FileBlobStore::new(dir, &config.storage_namespace))
        }
        StorageBackend::Redis { url } => {
            Arc::new(RedisBlobStore::connect(url, &config.storage_namespace)?)
        }
    };
    let transport = Arc::new(ReqwestTransport::new(ReqwestTransportConfig {
        timeout: Duration::from_secs(config.http_timeout_seconds),
        accept_invalid_certs: config.tls_insecure,
    })?);
    let service = BmcService::new(
        transport,
        store,
        ProxyConfig {
            proxy_url: config.proxy_url.clone(),
            enabled: config.proxy_enabled,
        },
    );
    let loaded = service.start().await;
    info!(target: "bmc.api", connections = loaded, "service_started");

    // MQTT 转发（可选）
    let forwarding = if config.mqtt_forward {
        let (publisher, eventloop) = forward::MqttPublisher::connect(forward::MqttForwardConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            qos: config.mqtt_qos,
        });
        let subscriptions =
            forward::attach(&service, Arc::new(publisher), &config.mqtt_topic_prefix);
        Some((subscriptions, eventloop))
    } else {
        None
    };

    let app = build_app(AppState {
        service: service.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "bmc.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown();
    if let Some((_, eventloop)) = forwarding {
        eventloop.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "bmc.api", error = %err, "shutdown_signal_failed");
    }
}
