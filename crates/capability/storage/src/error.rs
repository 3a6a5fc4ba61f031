//! 存储层错误类型
//!
//! 封装底层错误：
//! - 文件读写错误
//! - Redis 连接 / 命令错误
//! - 锁失败

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("lock failed")]
    Lock,

    /// 其他后端（测试替身、外部实现）
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
