//! 服务器记录、手动轮询与电源操作 handlers
//!
//! - GET /api/servers
//! - GET /api/servers/{id}
//! - POST /api/servers/poll
//! - POST /api/servers/{id}/poll
//! - POST /api/servers/{id}/power

use crate::AppState;
use crate::utils::{not_found_error, ok, parse_power_action, poll_summary_to_dto, poller_error};
use api_contract::{PollResultDto, PowerActionRequest, PowerActionResponse};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use bmc_polling::PollOutcome;

#[derive(serde::Deserialize)]
pub struct ServerPath {
    id: String,
}

/// 全部服务器记录
pub async fn list_servers(State(state): State<AppState>) -> Response {
    ok(state.service.list_servers())
}

/// 单个服务器记录
pub async fn get_server(State(state): State<AppState>, Path(path): Path<ServerPath>) -> Response {
    match state.service.get_server(&path.id) {
        Some(record) => ok(record),
        None => not_found_error(),
    }
}

/// 轮询全部连接
pub async fn poll_all(State(state): State<AppState>) -> Response {
    let summary = state.service.poll_all().await;
    ok(poll_summary_to_dto(summary))
}

/// 轮询单个连接
pub async fn poll_one(State(state): State<AppState>, Path(path): Path<ServerPath>) -> Response {
    let outcome = match state.service.poll_one(&path.id).await {
        Ok(outcome) => outcome,
        Err(err) => return poller_error(err),
    };
    let (label, error) = match outcome {
        PollOutcome::Succeeded => ("succeeded", None),
        PollOutcome::Failed(message) => ("failed", Some(message)),
        PollOutcome::Discarded => ("discarded", None),
    };
    ok(PollResultDto {
        server: state.service.get_server(&path.id),
        connection_id: path.id,
        outcome: label.to_string(),
        error,
    })
}

/// 电源操作
pub async fn power_action(
    State(state): State<AppState>,
    Path(path): Path<ServerPath>,
    Json(req): Json<PowerActionRequest>,
) -> Response {
    let action = match parse_power_action(&req.action) {
        Ok(action) => action,
        Err(response) => return response,
    };
    match state.service.power_action(&path.id, action).await {
        Ok(()) => ok(PowerActionResponse {
            connection_id: path.id,
            reset_type: action.reset_type().to_string(),
        }),
        Err(err) => poller_error(err),
    }
}
