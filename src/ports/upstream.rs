use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

/// Custom error type for upstream client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Error when the connection to the upstream controller fails
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error when the upstream call exceeds the configured timeout
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// Error when the outbound request cannot be constructed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for upstream client operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// A fully-built outbound request. Derived from exactly one inbound request
/// and issued at most once; there are no retries and redirects are never
/// followed.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Opaque body bytes; `None` when the inbound request carried no body.
    pub body: Option<Bytes>,
}

/// A buffered upstream response: status, headers and body exactly as the
/// controller returned them.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// UpstreamClient defines the port (interface) for issuing HTTP requests to
/// the upstream network controller.
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    /// Issue a single request to the upstream controller.
    ///
    /// Implementations must honor the configured timeout and TLS settings
    /// and must not follow redirects; a 3xx is returned like any other
    /// response.
    async fn execute(&self, req: UpstreamRequest) -> UpstreamResult<UpstreamResponse>;
}
