//! 内存存储实现模块
//!
//! 用于测试和不需要持久化的运行方式。

pub mod blob;

pub use blob::*;
