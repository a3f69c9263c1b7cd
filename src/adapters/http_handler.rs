//! HTTP handler wiring the access gate and the forwarder into axum.
//!
//! One handler instance serves all requests. `/health` answers before the
//! gate; everything else is evaluated by the gate and either rejected with a
//! JSON `detail` body or relayed upstream. Upstream connect failures and
//! timeouts surface as 502, never as a client error.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, Request},
    response::Response,
    routing::any,
};
use http::{StatusCode, header};
use http_body_util::BodyExt;

use crate::{
    config::ResolvedConfig,
    core::{
        AccessDecision, AccessGate, AuditRecord, AuditSink, Forwarder, UnknownPathLogger,
    },
    ports::upstream::{UpstreamClient, UpstreamError},
};

/// Request handler for the Palisade gateway.
pub struct GatewayHandler {
    gate: AccessGate,
    forwarder: Forwarder,
    unknown_paths: UnknownPathLogger,
}

impl GatewayHandler {
    pub fn new(
        config: Arc<ResolvedConfig>,
        client: Arc<dyn UpstreamClient>,
        audit_sink: Box<dyn AuditSink>,
    ) -> Self {
        Self {
            gate: AccessGate::new(config.clone()),
            forwarder: Forwarder::new(&config, client),
            unknown_paths: UnknownPathLogger::new(audit_sink),
        }
    }

    /// Main request handler: gate first, then relay.
    pub async fn handle_request(&self, req: Request<Body>, peer_addr: SocketAddr) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        // Liveness probe, exempt from the gate.
        if method == http::Method::GET && path == "/health" {
            return json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}));
        }

        match self
            .gate
            .evaluate(&method, &path, req.headers(), peer_addr.ip())
        {
            AccessDecision::Allowed { client_ip } => {
                tracing::debug!(%client_ip, %method, %path, "request allowed");
                self.relay(req, &path, query.as_deref()).await
            }
            AccessDecision::IpRejected { client_ip } => {
                tracing::info!(%client_ip, %method, %path, "source IP rejected");
                reject(
                    StatusCode::FORBIDDEN,
                    &format!("Source IP not allowed: {client_ip}"),
                )
            }
            AccessDecision::KeyMissing => {
                tracing::info!(%method, %path, "request without API key");
                reject(StatusCode::UNAUTHORIZED, "Missing API key")
            }
            AccessDecision::KeyInvalid => {
                tracing::info!(%method, %path, "request with invalid API key");
                reject(StatusCode::FORBIDDEN, "Invalid API key")
            }
            AccessDecision::RouteRejected { client_ip } => {
                let user_agent = req
                    .headers()
                    .get(header::USER_AGENT)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .unwrap_or_default();
                self.unknown_paths.record(&AuditRecord {
                    client_ip,
                    method: method.to_string(),
                    path: path.clone(),
                    query: query.unwrap_or_default(),
                    user_agent,
                });
                reject(StatusCode::NOT_FOUND, "Not found")
            }
        }
    }

    async fn relay(&self, req: Request<Body>, path: &str, query: Option<&str>) -> Response {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                return reject(StatusCode::BAD_REQUEST, "Invalid request body");
            }
        };

        match self
            .forwarder
            .forward(parts.method, path, query, &parts.headers, body)
            .await
        {
            Ok(upstream) => {
                let mut response = Response::new(Body::from(upstream.body));
                *response.status_mut() = upstream.status;
                *response.headers_mut() = upstream.headers;
                response
            }
            Err(e @ UpstreamError::Timeout(_)) => {
                tracing::error!(error = %e, "upstream call timed out");
                reject(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
            Err(e) => {
                tracing::error!(error = %e, "upstream call failed");
                reject(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        }
    }
}

/// Build the axum router serving the gateway.
pub fn router(handler: Arc<GatewayHandler>) -> Router {
    let make_request_route = |handler: Arc<GatewayHandler>| {
        any(
            move |ConnectInfo(peer_addr): ConnectInfo<SocketAddr>, req: Request| async move {
                handler.handle_request(req, peer_addr).await
            },
        )
    };

    Router::new()
        .route("/{*path}", make_request_route(handler.clone()))
        .route("/", make_request_route(handler))
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

fn reject(status: StatusCode, detail: &str) -> Response {
    json_response(status, &serde_json::json!({ "detail": detail }))
}
