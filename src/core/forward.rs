//! Relay of approved requests to the upstream controller.
//!
//! The forwarder builds exactly one outbound request per approved inbound
//! request: target URL is the configured base concatenated with the original
//! path and query verbatim, headers come from the sanitizer, the body is
//! passed through as opaque bytes (omitted when empty). The upstream response
//! is relayed with its status and body untouched and transport-framing
//! headers stripped.
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::{
    config::ResolvedConfig,
    core::headers::{HeaderSanitizer, strip_response_headers},
    ports::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse, UpstreamResult},
};

pub struct Forwarder {
    base_url: String,
    sanitizer: HeaderSanitizer,
    client: Arc<dyn UpstreamClient>,
}

impl Forwarder {
    pub fn new(config: &ResolvedConfig, client: Arc<dyn UpstreamClient>) -> Self {
        Self {
            base_url: config.upstream_base_url.clone(),
            sanitizer: HeaderSanitizer::new(
                config.upstream_key_header.clone(),
                config.upstream_key.clone(),
            ),
            client,
        }
    }

    /// Issue the upstream call and return the response with framing headers
    /// already stripped, ready to relay.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        inbound_headers: &HeaderMap,
        body: Bytes,
    ) -> UpstreamResult<UpstreamResponse> {
        let url = self.target_url(path, query);
        let headers = self.sanitizer.sanitize(inbound_headers);

        tracing::debug!(%method, %url, "forwarding request upstream");

        let response = self
            .client
            .execute(UpstreamRequest {
                method,
                url,
                headers,
                body: if body.is_empty() { None } else { Some(body) },
            })
            .await?;

        Ok(UpstreamResponse {
            status: response.status,
            headers: strip_response_headers(&response.headers),
            body: response.body,
        })
    }

    /// Base URL + original path, plus `?query` only when the query string is
    /// non-empty. No re-encoding of either part.
    fn target_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use http::{HeaderValue, StatusCode};

    use crate::config::{
        AuthConfig, FirewallConfig, GatewayConfig, LoggingConfig, ServerConfig, UpstreamConfig,
    };

    use super::*;

    /// Records the requests it receives and returns a canned response.
    struct RecordingClient {
        requests: Mutex<Vec<UpstreamRequest>>,
        response: UpstreamResponse,
    }

    impl RecordingClient {
        fn new(response: UpstreamResponse) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response,
            }
        }
    }

    #[async_trait]
    impl UpstreamClient for RecordingClient {
        async fn execute(&self, req: UpstreamRequest) -> UpstreamResult<UpstreamResponse> {
            self.requests.lock().unwrap().push(req);
            Ok(self.response.clone())
        }
    }

    fn resolved() -> ResolvedConfig {
        GatewayConfig {
            firewall: FirewallConfig {
                allowed_source_ips: vec!["10.0.0.5".to_string()],
            },
            auth: AuthConfig {
                external_api_key: "secret".to_string(),
            },
            upstream: UpstreamConfig {
                base_url: "https://controller.local:8443".to_string(),
                api_key: "upstream-key".to_string(),
                api_key_header: "X-API-KEY".to_string(),
                verify_tls: true,
                timeout_secs: 20,
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            routes: None,
        }
        .resolve()
        .expect("valid config")
    }

    fn ok_response() -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        }
    }

    #[tokio::test]
    async fn target_url_appends_query_only_when_present() {
        let client = Arc::new(RecordingClient::new(ok_response()));
        let forwarder = Forwarder::new(&resolved(), client.clone());

        forwarder
            .forward(
                Method::GET,
                "/proxy/network/integration/v1/sites",
                None,
                &HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap();
        forwarder
            .forward(
                Method::GET,
                "/proxy/network/integration/v1/sites",
                Some("limit=5&offset=10"),
                &HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap();
        forwarder
            .forward(
                Method::GET,
                "/proxy/network/integration/v1/sites",
                Some(""),
                &HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(
            requests[0].url,
            "https://controller.local:8443/proxy/network/integration/v1/sites"
        );
        assert_eq!(
            requests[1].url,
            "https://controller.local:8443/proxy/network/integration/v1/sites?limit=5&offset=10"
        );
        // Empty query string: no trailing '?'.
        assert_eq!(requests[2].url, requests[0].url);
    }

    #[tokio::test]
    async fn empty_body_is_omitted_nonempty_passed_through() {
        let client = Arc::new(RecordingClient::new(ok_response()));
        let forwarder = Forwarder::new(&resolved(), client.clone());

        forwarder
            .forward(Method::GET, "/a", None, &HeaderMap::new(), Bytes::new())
            .await
            .unwrap();
        forwarder
            .forward(
                Method::POST,
                "/a",
                None,
                &HeaderMap::new(),
                Bytes::from_static(b"{\"action\":\"block\"}"),
            )
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].body.is_none());
        assert_eq!(
            requests[1].body.as_deref(),
            Some(b"{\"action\":\"block\"}" as &[u8])
        );
    }

    #[tokio::test]
    async fn outbound_headers_are_sanitized_and_credentialed() {
        let client = Arc::new(RecordingClient::new(ok_response()));
        let forwarder = Forwarder::new(&resolved(), client.clone());

        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer secret"));
        inbound.insert("connection", HeaderValue::from_static("keep-alive"));
        inbound.insert("accept", HeaderValue::from_static("application/json"));

        forwarder
            .forward(Method::GET, "/a", None, &inbound, Bytes::new())
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        let headers = &requests[0].headers;
        assert!(!headers.contains_key("authorization"));
        assert!(!headers.contains_key("connection"));
        assert_eq!(headers.get("accept").unwrap(), "application/json");
        assert_eq!(headers.get("x-api-key").unwrap(), "upstream-key");
    }

    #[tokio::test]
    async fn response_is_relayed_with_framing_headers_stripped() {
        let mut upstream_headers = HeaderMap::new();
        upstream_headers.insert("content-type", HeaderValue::from_static("application/json"));
        upstream_headers.insert("content-encoding", HeaderValue::from_static("gzip"));
        let client = Arc::new(RecordingClient::new(UpstreamResponse {
            status: StatusCode::IM_A_TEAPOT,
            headers: upstream_headers,
            body: Bytes::from_static(b"leaf"),
        }));
        let forwarder = Forwarder::new(&resolved(), client);

        let relayed = forwarder
            .forward(Method::GET, "/a", None, &HeaderMap::new(), Bytes::new())
            .await
            .unwrap();

        assert_eq!(relayed.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(relayed.body, Bytes::from_static(b"leaf"));
        assert!(!relayed.headers.contains_key("content-encoding"));
        assert_eq!(
            relayed.headers.get("content-type").unwrap(),
            "application/json"
        );
    }
}
