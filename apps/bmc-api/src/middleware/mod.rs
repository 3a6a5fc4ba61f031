//! 中间件

mod request_context;

pub use request_context::request_context;
