//! HTTP front-end

pub mod http;
pub mod tracing_middleware;

pub use http::{create_router, serve, ApiState};
