use async_trait::async_trait;
use eyre::{Context, Result};

use crate::{
    config::ResolvedConfig,
    ports::upstream::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse, UpstreamResult},
};

/// Upstream client adapter built on reqwest (rustls).
///
/// Responsibilities:
/// * Applies the configured per-request timeout
/// * Honors the TLS-verification toggle
/// * Never follows redirects; a 3xx comes back as a normal response
///
/// This adapter is intentionally minimal; the gateway performs no retries,
/// caching or connection-level tricks on top of it.
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ReqwestUpstreamClient {
    /// Build a client from the resolved configuration.
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(!config.verify_upstream_tls)
            .build()
            .context("Failed to build upstream HTTP client")?;

        if !config.verify_upstream_tls {
            tracing::warn!("upstream TLS certificate verification is disabled");
        }

        Ok(Self {
            client,
            timeout_secs: config.upstream_timeout.as_secs(),
        })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn execute(&self, req: UpstreamRequest) -> UpstreamResult<UpstreamResponse> {
        let mut builder = self
            .client
            .request(req.method.clone(), req.url.as_str())
            .headers(req.headers);
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        // Order matters: reqwest flags connection failures as request
        // errors too, so is_connect is checked before the builder/request
        // branch.
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                UpstreamError::Connection(e.to_string())
            } else if e.is_builder() || e.is_request() {
                UpstreamError::InvalidRequest(e.to_string())
            } else {
                UpstreamError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout_secs)
            } else {
                UpstreamError::Connection(e.to_string())
            }
        })?;

        tracing::debug!(%status, url = %req.url, "upstream response received");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
