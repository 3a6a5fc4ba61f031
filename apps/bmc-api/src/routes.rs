//! 路由定义
//!
//! - 系统：/health, /metrics
//! - 连接管理：/api/connections/*
//! - 服务器记录与操作：/api/servers/*
//! - 转发代理：/api/proxy

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 根路径下的系统接口
pub fn create_system_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
}

/// 业务接口（挂载在 `/api` 下）
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/connections",
            get(list_connections).post(create_connection),
        )
        .route("/connections/test", post(test_connection))
        .route(
            "/connections/:id",
            get(get_connection)
                .patch(update_connection)
                .delete(delete_connection),
        )
        .route("/servers", get(list_servers))
        .route("/servers/poll", post(poll_all))
        .route("/servers/:id", get(get_server))
        .route("/servers/:id/poll", post(poll_one))
        .route("/servers/:id/power", post(power_action))
        .route("/proxy", get(get_proxy).put(update_proxy))
}
