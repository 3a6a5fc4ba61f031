//! # BMC Storage 模块
//!
//! 轮询核心只需要一个"按键读写字节块"的存储协作方，本模块提供该抽象及其实现。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：[`BlobStore`]，`get(key)` / `set(key, bytes)`
//! 2. **错误处理层** (`error.rs`)：统一的 [`StorageError`]
//! 3. **实现层**：
//!    - `in_memory/`：内存实现（测试、无状态运行）
//!    - `file`：每个键一个文件，写入先落临时文件再原子重命名
//!    - `redis`：Redis 字符串键，带命名空间前缀
//!
//! ## 使用的键
//!
//! | 键 | 内容 |
//! |---|---|
//! | `connections` | 连接配置 JSON 数组（含明文凭据） |
//! | `redfish-proxy` | 转发代理设置 JSON 对象 |
//!
//! 存储层不解释字节内容，序列化由调用方负责。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use bmc_storage::{BlobStore, FileBlobStore};
//!
//! let store = FileBlobStore::new("./data", "bmc");
//! store.set("connections", b"[]".to_vec()).await?;
//! let bytes = store.get("connections").await?;
//! ```

pub mod error;
pub mod file;
pub mod in_memory;
pub mod redis;
pub mod traits;

pub use error::*;
pub use file::FileBlobStore;
pub use in_memory::InMemoryBlobStore;
pub use redis::RedisBlobStore;
pub use traits::*;
