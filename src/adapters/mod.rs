pub mod http_handler;
pub mod upstream_reqwest;

/// Re-export commonly used types from adapters
pub use http_handler::{GatewayHandler, router};
pub use upstream_reqwest::ReqwestUpstreamClient;
