//! Redfish 错误类型定义

/// Redfish 通信错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RedfishError {
    /// 未收到任何 HTTP 响应（DNS、拒绝连接、超时）
    #[error("transport error: {0}")]
    Transport(String),

    /// 收到非 2xx 响应
    #[error("redfish api error: {status} {reason}")]
    Protocol { status: u16, reason: String },

    /// 电源操作收到非 2xx 响应
    #[error("power action {reset_type} failed: {status} {reason}")]
    Action {
        reset_type: String,
        status: u16,
        reason: String,
    },

    /// 响应体无法解析
    #[error("decode error: {0}")]
    Decode(String),
}

impl RedfishError {
    /// HTTP 状态码（仅 Protocol / Action）。
    pub fn status(&self) -> Option<u16> {
        match self {
            RedfishError::Protocol { status, .. } | RedfishError::Action { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
