//! 连接 CRUD 与测试 handlers
//!
//! - GET /api/connections - 列出连接
//! - POST /api/connections - 新增连接（启用时立即开始轮询）
//! - GET /api/connections/{id} - 获取连接
//! - PATCH /api/connections/{id} - 局部更新
//! - DELETE /api/connections/{id} - 删除连接及其服务器记录
//! - POST /api/connections/test - 探测候选连接，不保存
//!
//! 返回结构不含凭据。

use crate::AppState;
use crate::utils::{
    bad_request_error, clamp_poll_interval, normalize_optional, normalize_required, not_found_error,
    ok, poller_error,
};
use api_contract::{
    ConnectionDto, ConnectionRequest, TestConnectionResponse, UpdateConnectionRequest,
};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use domain::{ConnectionDraft, ConnectionKind, ConnectionPatch, Scheme};

#[derive(serde::Deserialize)]
pub struct ConnectionPath {
    id: String,
}

/// 请求体转为草稿：补默认值并校验必填字段。
fn draft_from_request(req: ConnectionRequest) -> Result<ConnectionDraft, Response> {
    let host = normalize_required(req.host, "host")?;
    let username = normalize_required(req.username, "username")?;
    if req.password.is_empty() {
        return Err(bad_request_error("password required"));
    }
    let name = match normalize_optional(req.name.filter(|name| !name.trim().is_empty()), "name")? {
        Some(name) => name,
        None => host.clone(),
    };
    let protocol = req.protocol.unwrap_or(Scheme::Https);
    let port = req.port.unwrap_or(match protocol {
        Scheme::Https => 443,
        Scheme::Http => 80,
    });
    if port == 0 {
        return Err(bad_request_error("port must be within 1..=65535"));
    }
    Ok(ConnectionDraft {
        name,
        host,
        port,
        protocol,
        username,
        secret: req.password,
        kind: req.kind.unwrap_or(ConnectionKind::Redfish),
        enabled: req.enabled.unwrap_or(true),
        poll_interval_seconds: clamp_poll_interval(req.poll_interval_seconds),
    })
}

/// 列出连接
pub async fn list_connections(State(state): State<AppState>) -> Response {
    let data: Vec<ConnectionDto> = state
        .service
        .list_connections()
        .into_iter()
        .map(ConnectionDto::from)
        .collect();
    ok(data)
}

/// 新增连接
pub async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionRequest>,
) -> Response {
    let draft = match draft_from_request(req) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    match state.service.add_connection(draft).await {
        Ok(connection) => ok(ConnectionDto::from(connection)),
        Err(err) => poller_error(err),
    }
}

/// 获取连接
pub async fn get_connection(
    State(state): State<AppState>,
    Path(path): Path<ConnectionPath>,
) -> Response {
    match state.service.get_connection(&path.id) {
        Some(connection) => ok(ConnectionDto::from(connection)),
        None => not_found_error(),
    }
}

/// 局部更新连接
pub async fn update_connection(
    State(state): State<AppState>,
    Path(path): Path<ConnectionPath>,
    Json(req): Json<UpdateConnectionRequest>,
) -> Response {
    let name = match normalize_optional(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let host = match normalize_optional(req.host, "host") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let username = match normalize_optional(req.username, "username") {
        Ok(value) => value,
        Err(response) => return response,
    };
    if matches!(req.password.as_deref(), Some("")) {
        return bad_request_error("password required");
    }
    let patch = ConnectionPatch {
        name,
        host,
        port: req.port,
        protocol: req.protocol,
        username,
        secret: req.password,
        kind: req.kind,
        enabled: req.enabled,
        poll_interval_seconds: req
            .poll_interval_seconds
            .map(|seconds| clamp_poll_interval(Some(seconds))),
    };
    if patch == ConnectionPatch::default() {
        return bad_request_error("empty update");
    }
    match state.service.update_connection(&path.id, patch).await {
        Ok(Some(connection)) => ok(ConnectionDto::from(connection)),
        Ok(None) => not_found_error(),
        Err(err) => poller_error(err),
    }
}

/// 删除连接
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(path): Path<ConnectionPath>,
) -> Response {
    if state.service.remove_connection(&path.id).await {
        ok(())
    } else {
        not_found_error()
    }
}

/// 测试候选连接（不保存）
pub async fn test_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionRequest>,
) -> Response {
    let draft = match draft_from_request(req) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    let outcome = state.service.test_connection(draft).await;
    ok(TestConnectionResponse {
        success: outcome.success,
        message: outcome.message,
        data: outcome.data,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::{FakeBmc, call, service_with};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_applies_defaults_and_hides_secret() {
        let service = service_with(FakeBmc::new());
        let (status, body) = call(
            &service,
            "POST",
            "/api/connections",
            Some(json!({
                "host": " 10.1.0.1 ",
                "username": "admin",
                "password": "pw",
                "enabled": false,
                "pollIntervalSeconds": 1
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["name"], "10.1.0.1");
        assert_eq!(data["host"], "10.1.0.1");
        assert_eq!(data["port"], 443);
        assert_eq!(data["protocol"], "https");
        assert_eq!(data["type"], "redfish");
        assert_eq!(data["pollIntervalSeconds"], 5);
        assert!(data.get("password").is_none());
        assert!(data.get("secret").is_none());

        let stored = service.list_connections();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].secret, "pw");
    }

    #[tokio::test]
    async fn create_rejects_missing_credentials() {
        let service = service_with(FakeBmc::new());
        let (status, body) = call(
            &service,
            "POST",
            "/api/connections",
            Some(json!({ "host": "10.1.0.2", "username": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID.REQUEST");
        assert!(service.list_connections().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_round_trip() {
        let service = service_with(FakeBmc::new());
        let connection = service
            .add_connection(crate::test_support::draft("r1", "10.1.0.3", false))
            .await
            .expect("add");
        let uri = format!("/api/connections/{}", connection.id);

        let (status, body) = call(
            &service,
            "PATCH",
            &uri,
            Some(json!({ "name": "rack-1", "pollIntervalSeconds": 7200 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "rack-1");
        assert_eq!(body["data"]["pollIntervalSeconds"], 3600);

        let (status, _) = call(&service, "PATCH", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&service, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&service, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "RESOURCE.NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_connection_update_is_not_found() {
        let service = service_with(FakeBmc::new());
        let (status, _) = call(
            &service,
            "PATCH",
            "/api/connections/conn-missing",
            Some(json!({ "enabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_endpoint_reports_outcome_without_saving() {
        let bmc = FakeBmc::new();
        bmc.fail_with("10.1.0.5", 401);
        let service = service_with(bmc);

        let (status, body) = call(
            &service,
            "POST",
            "/api/connections/test",
            Some(json!({ "host": "10.1.0.4", "username": "admin", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], true);
        assert_eq!(
            body["data"]["message"],
            "Connected successfully! Redfish version: 1.11.0"
        );
        assert_eq!(body["data"]["data"]["hardware"]["manufacturer"], "HPE");

        let (_, body) = call(
            &service,
            "POST",
            "/api/connections/test",
            Some(json!({ "host": "10.1.0.5", "username": "admin", "password": "pw" })),
        )
        .await;
        assert_eq!(body["data"]["success"], false);
        assert_eq!(body["data"]["message"], "redfish api error: 401 Unauthorized");
        assert!(service.list_connections().is_empty());
    }
}
