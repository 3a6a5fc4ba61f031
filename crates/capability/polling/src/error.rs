use bmc_redfish::RedfishError;

/// 轮询核心对调用方暴露的错误。
///
/// 持久化失败不在此列：注册表内部记录日志后吞掉，内存状态为准。
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("unknown connection: {0}")]
    UnknownConnection(String),
    #[error("invalid connection: {0}")]
    InvalidConnection(String),
    #[error(transparent)]
    Redfish(#[from] RedfishError),
}
