//! 输入验证辅助函数
//!
//! - normalize_required：必填字段，去除首尾空格后非空
//! - normalize_optional：可选字段，提供时同样要求非空
//! - clamp_poll_interval：轮询间隔限定在 [5, 3600] 秒，缺省 30
//! - parse_power_action：电源操作名转换为 PowerAction
//!
//! 失败返回 bad_request_error 响应。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use bmc_redfish::PowerAction;

pub const MIN_POLL_INTERVAL_SECONDS: u64 = 5;
pub const MAX_POLL_INTERVAL_SECONDS: u64 = 3600;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 验证可选字段，如果提供则去除空格并检查非空
pub fn normalize_optional(value: Option<String>, field: &str) -> Result<Option<String>, Response> {
    match value {
        Some(value) => normalize_required(value, field).map(Some),
        None => Ok(None),
    }
}

/// 轮询间隔（秒）限幅
pub fn clamp_poll_interval(value: Option<u64>) -> u64 {
    value
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS)
        .clamp(MIN_POLL_INTERVAL_SECONDS, MAX_POLL_INTERVAL_SECONDS)
}

/// 解析电源操作：on / off / reset / gracefulShutdown（也接受 Redfish 原始 ResetType）
pub fn parse_power_action(value: &str) -> Result<PowerAction, Response> {
    match value.trim() {
        "on" | "On" => Ok(PowerAction::On),
        "off" | "ForceOff" => Ok(PowerAction::ForceOff),
        "reset" | "ForceRestart" => Ok(PowerAction::ForceRestart),
        "gracefulShutdown" | "GracefulShutdown" => Ok(PowerAction::GracefulShutdown),
        other => Err(bad_request_error(format!("unsupported power action: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_clamped() {
        assert_eq!(clamp_poll_interval(None), 30);
        assert_eq!(clamp_poll_interval(Some(1)), 5);
        assert_eq!(clamp_poll_interval(Some(0)), 5);
        assert_eq!(clamp_poll_interval(Some(120)), 120);
        assert_eq!(clamp_poll_interval(Some(86_400)), 3600);
    }

    #[test]
    fn power_actions_parse() {
        assert!(matches!(parse_power_action("reset"), Ok(PowerAction::ForceRestart)));
        assert!(matches!(
            parse_power_action("GracefulShutdown"),
            Ok(PowerAction::GracefulShutdown)
        ));
        assert!(parse_power_action("nmi").is_err());
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(normalize_required("  ".to_string(), "host").is_err());
        assert_eq!(
            normalize_optional(Some(" r1 ".to_string()), "name").ok().flatten(),
            Some("r1".to_string())
        );
        assert!(normalize_optional(None, "name").expect("none").is_none());
    }
}
