//! The access gate: the single security boundary of the gateway.
//!
//! Every inbound request is evaluated in a fixed order — client IP
//! resolution, IP allowlist, API key, route allowlist — and the first failing
//! check determines the decision. The gate is pure decision logic over the
//! immutable [`ResolvedConfig`]; the only side effect (the unknown-path audit
//! record) is triggered by the caller on [`AccessDecision::RouteRejected`].
use std::{net::IpAddr, sync::Arc};

use http::{HeaderMap, Method};

use crate::config::ResolvedConfig;

/// Outcome of gate evaluation. Exactly one reason, decided by the first
/// failing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Request may be forwarded upstream.
    Allowed { client_ip: IpAddr },
    /// Resolved client address not in the allowlist (or unparseable). Carries
    /// the address text reported back to the caller.
    IpRejected { client_ip: String },
    /// Neither credential header was present.
    KeyMissing,
    /// A credential was presented but did not match the shared secret.
    KeyInvalid,
    /// IP and key were fine but the method + path pair is not allowlisted.
    RouteRejected { client_ip: IpAddr },
}

pub struct AccessGate {
    config: Arc<ResolvedConfig>,
}

impl AccessGate {
    pub fn new(config: Arc<ResolvedConfig>) -> Self {
        Self { config }
    }

    /// Evaluate a request. `peer_addr` is the transport-layer peer; the
    /// proxy header only overrides it when `trust_proxy_headers` is set.
    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        peer_addr: IpAddr,
    ) -> AccessDecision {
        let client_ip = match self.resolve_client_ip(headers, peer_addr) {
            Ok(ip) => ip,
            // An unparseable proxy-header value can never be allowlisted.
            Err(raw) => return AccessDecision::IpRejected { client_ip: raw },
        };

        if !self.config.allowed_source_ips.contains(&client_ip) {
            return AccessDecision::IpRejected {
                client_ip: client_ip.to_string(),
            };
        }

        match supplied_external_key(headers) {
            None => return AccessDecision::KeyMissing,
            Some(supplied) if supplied.as_bytes() != self.config.external_api_key.as_bytes() => {
                return AccessDecision::KeyInvalid;
            }
            Some(_) => {}
        }

        if !self.config.routes.is_allowed(method, path) {
            return AccessDecision::RouteRejected { client_ip };
        }

        AccessDecision::Allowed { client_ip }
    }

    /// Resolve the client address. With proxy trust enabled and the
    /// configured header present, the first comma-separated token wins;
    /// otherwise the transport peer address is used. An unparseable header
    /// value is returned as `Err` with the raw text.
    fn resolve_client_ip(&self, headers: &HeaderMap, peer_addr: IpAddr) -> Result<IpAddr, String> {
        if self.config.trust_proxy_headers
            && let Some(value) = headers.get(self.config.real_ip_header.as_str())
        {
            let raw = String::from_utf8_lossy(value.as_bytes());
            let candidate = raw.split(',').next().unwrap_or("").trim();
            return candidate
                .parse::<IpAddr>()
                .map_err(|_| candidate.to_string());
        }
        Ok(peer_addr)
    }
}

/// Extract the caller-supplied key: `x-api-key` first, then `authorization`
/// with a case-insensitive `Bearer ` prefix stripped and trimmed.
fn supplied_external_key(headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get("x-api-key")
        .or_else(|| headers.get(http::header::AUTHORIZATION))?;
    let supplied = String::from_utf8_lossy(value.as_bytes()).into_owned();
    // Prefix check on bytes: the value may hold multibyte characters at any
    // offset, so a fixed string slice could split a character. Once the
    // 7-byte ASCII prefix matches, slicing at 7 is boundary-safe.
    let has_bearer_prefix = supplied
        .as_bytes()
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(b"bearer "));
    if has_bearer_prefix {
        Some(supplied[7..].trim().to_string())
    } else {
        Some(supplied)
    }
}
