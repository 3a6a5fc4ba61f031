//! 总线事件转发到 MQTT
//!
//! - 快照：`{prefix}/servers`，payload 为完整服务器记录列表
//! - 错误：`{prefix}/errors/{connection_id}`，payload `{"connectionId","message","tsMs"}`
//!
//! 总线回调是同步的，发布使用非阻塞的 `try_publish`；发布失败只计数与记日志。

use bmc_polling::{BmcService, Subscription};
use bmc_telemetry::record_forward_failure;
use domain::now_epoch_ms;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("publish error: {0}")]
    Publish(String),
    #[error("payload error: {0}")]
    Payload(String),
}

/// 事件发布端抽象。
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: String, payload: Vec<u8>) -> Result<(), ForwardError>;
}

/// MQTT 转发配置。
#[derive(Debug, Clone)]
pub struct MqttForwardConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub qos: u8,
}

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    /// 建立客户端并派生 eventloop 任务（断线后每秒重试）。
    pub fn connect(config: MqttForwardConfig) -> (Self, tokio::task::JoinHandle<()>) {
        let client_id = format!("bmc-forward-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "bmc.forward", error = %err, "mqtt_eventloop_error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        (
            Self {
                client,
                qos: qos_from_u8(config.qos),
            },
            handle,
        )
    }
}

impl EventPublisher for MqttPublisher {
    fn publish(&self, topic: String, payload: Vec<u8>) -> Result<(), ForwardError> {
        self.client
            .try_publish(topic, self.qos, false, payload)
            .map_err(|err| ForwardError::Publish(err.to_string()))
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

pub fn servers_topic(prefix: &str) -> String {
    format!("{}/servers", prefix.trim_end_matches('/'))
}

pub fn error_topic(prefix: &str, connection_id: &str) -> String {
    format!("{}/errors/{}", prefix.trim_end_matches('/'), connection_id)
}

/// 订阅数据与错误两个通道并转发。返回的订阅句柄由调用方持有。
pub fn attach(
    service: &BmcService,
    publisher: Arc<dyn EventPublisher>,
    topic_prefix: &str,
) -> Vec<Subscription> {
    let data_publisher = publisher.clone();
    let data_topic = servers_topic(topic_prefix);
    let data = service.subscribe(move |records| {
        let result = serde_json::to_vec(records)
            .map_err(|err| ForwardError::Payload(err.to_string()))
            .and_then(|payload| data_publisher.publish(data_topic.clone(), payload));
        report(&data_topic, records.len(), result);
    });

    let prefix = topic_prefix.to_string();
    let errors = service.subscribe_to_errors(move |connection_id, message| {
        let topic = error_topic(&prefix, connection_id);
        let body = serde_json::json!({
            "connectionId": connection_id,
            "message": message,
            "tsMs": now_epoch_ms(),
        });
        let result = serde_json::to_vec(&body)
            .map_err(|err| ForwardError::Payload(err.to_string()))
            .and_then(|payload| publisher.publish(topic.clone(), payload));
        report(&topic, 1, result);
    });

    vec![data, errors]
}

fn report(topic: &str, items: usize, result: Result<(), ForwardError>) {
    match result {
        Ok(()) => debug!(target: "bmc.forward", topic = %topic, items, "event_forwarded"),
        Err(err) => {
            record_forward_failure();
            warn!(target: "bmc.forward", topic = %topic, error = %err, "event_forward_failed");
        }
    }
}
