//! 健康检查与指标
//!
//! - GET /health
//! - GET /metrics

use crate::AppState;
use crate::utils::{metrics_to_dto, ok};
use api_contract::HealthDto;
use axum::{extract::State, response::Response};
use bmc_telemetry::metrics;

pub async fn health(State(state): State<AppState>) -> Response {
    ok(HealthDto {
        ok: true,
        connections: state.service.list_connections().len(),
        scheduled: state.service.scheduled_connection_ids().len(),
    })
}

pub async fn get_metrics() -> Response {
    ok(metrics_to_dto(metrics().snapshot()))
}
