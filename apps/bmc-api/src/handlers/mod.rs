//! Handlers 模块

pub mod connections;
pub mod proxy;
pub mod servers;
pub mod system;

pub use connections::*;
pub use proxy::*;
pub use servers::*;
pub use system::*;
