//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, bad_gateway_error
//! - 轮询错误映射：poller_error
//! - DTO 转换：poll_summary_to_dto, metrics_to_dto

use api_contract::{ApiResponse, MetricsSnapshotDto, PollFailureDto, PollSummaryDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bmc_polling::{PollSummary, PollerError};
use bmc_telemetry::MetricsSnapshot;

/// 成功响应
pub fn ok<T: serde::Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// BMC 侧错误响应（传输失败或非 2xx）
pub fn bad_gateway_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiResponse::<()>::error("UPSTREAM.ERROR", message.into())),
    )
        .into_response()
}

/// PollerError 映射为 HTTP 响应
pub fn poller_error(err: PollerError) -> Response {
    match err {
        PollerError::UnknownConnection(_) => not_found_error(),
        PollerError::InvalidConnection(message) => bad_request_error(message),
        PollerError::Redfish(err) => bad_gateway_error(err.to_string()),
    }
}

/// PollSummary 转 PollSummaryDto
pub fn poll_summary_to_dto(summary: PollSummary) -> PollSummaryDto {
    PollSummaryDto {
        succeeded: summary.succeeded,
        failed: summary
            .failed
            .into_iter()
            .map(|(connection_id, error)| PollFailureDto {
                connection_id,
                error,
            })
            .collect(),
    }
}

/// MetricsSnapshot 转 MetricsSnapshotDto
pub fn metrics_to_dto(snapshot: MetricsSnapshot) -> MetricsSnapshotDto {
    MetricsSnapshotDto {
        polls_started: snapshot.polls_started,
        polls_succeeded: snapshot.polls_succeeded,
        polls_failed: snapshot.polls_failed,
        ticks_skipped: snapshot.ticks_skipped,
        results_discarded: snapshot.results_discarded,
        snapshots_published: snapshot.snapshots_published,
        error_events_published: snapshot.error_events_published,
        handler_panics: snapshot.handler_panics,
        persist_failures: snapshot.persist_failures,
        power_actions: snapshot.power_actions,
        power_action_failures: snapshot.power_action_failures,
        forward_failures: snapshot.forward_failures,
        poll_latency_ms_total: snapshot.poll_latency_ms_total,
        poll_latency_ms_count: snapshot.poll_latency_ms_count,
    }
}
