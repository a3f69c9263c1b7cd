//! Configuration data structures for Palisade.
//!
//! These types map directly to YAML (also TOML / JSON) configuration files.
//! They are intentionally serde-friendly and include defaults so that minimal
//! configs remain concise. [`GatewayConfig::resolve`] turns the raw file
//! representation into the canonical, immutable [`ResolvedConfig`] the request
//! pipeline reads for the lifetime of the process.
use std::{collections::HashSet, net::IpAddr, time::Duration};

use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{
    config::validation::ValidationError,
    core::routes::{RouteRule, RouteTable},
};

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_key_header() -> String {
    "X-API-KEY".to_string()
}

fn default_verify_tls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_real_ip_header() -> String {
    "x-forwarded-for".to_string()
}

fn default_unknown_paths_log() -> String {
    "unknown_paths.log".to_string()
}

/// Source-IP allowlist settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FirewallConfig {
    /// IP addresses allowed to call the gateway. Exact addresses, no CIDR.
    pub allowed_source_ips: Vec<String>,
}

/// Shared secret expected from callers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Key callers must present via `X-API-KEY` or `Authorization: Bearer`.
    pub external_api_key: String,
}

/// Connection settings for the upstream network controller.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the controller API (scheme + authority, no trailing slash).
    pub base_url: String,
    /// Credential injected into every forwarded request.
    pub api_key: String,
    /// Header name carrying the upstream credential.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Whether to verify the upstream TLS certificate.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    /// Upper bound for a single upstream call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Listener and client-address resolution settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// The address the gateway listens on.
    pub listen_addr: String,
    /// Trust a proxy-supplied header for the client address instead of the
    /// transport peer address.
    pub trust_proxy_headers: bool,
    /// Header consulted when `trust_proxy_headers` is set.
    pub real_ip_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            trust_proxy_headers: false,
            real_ip_header: default_real_ip_header(),
        }
    }
}

/// Audit logging settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// File receiving one line per request rejected by the route table.
    pub unknown_paths_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            unknown_paths_log: default_unknown_paths_log(),
        }
    }
}

/// A single route-table entry as written in the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouteRuleConfig {
    /// HTTP method, e.g. "GET".
    pub method: String,
    /// Regex the full request path (query excluded) must match entirely.
    pub path: String,
}

/// Top-level configuration as deserialized from the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub firewall: FirewallConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Optional override of the built-in route table.
    #[serde(default)]
    pub routes: Option<Vec<RouteRuleConfig>>,
}

impl GatewayConfig {
    /// Resolve the raw file representation into the canonical form used by
    /// the request pipeline. Fails on any value the pipeline could not use
    /// (unparseable IPs, invalid header name, bad route regex).
    pub fn resolve(&self) -> Result<ResolvedConfig, ValidationError> {
        let mut allowed_source_ips = HashSet::new();
        for raw in &self.firewall.allowed_source_ips {
            let ip: IpAddr = raw
                .parse()
                .map_err(|_| ValidationError::InvalidSourceIp { value: raw.clone() })?;
            allowed_source_ips.insert(ip);
        }

        let upstream_key_header = HeaderName::from_bytes(self.upstream.api_key_header.as_bytes())
            .map_err(|_| ValidationError::InvalidHeaderName {
            value: self.upstream.api_key_header.clone(),
        })?;
        let upstream_key = HeaderValue::from_str(&self.upstream.api_key).map_err(|_| {
            ValidationError::InvalidField {
                field: "upstream.api_key".to_string(),
                message: "not a valid header value".to_string(),
            }
        })?;

        let routes = match &self.routes {
            Some(rules) => {
                let mut parsed = Vec::with_capacity(rules.len());
                for rule in rules {
                    parsed.push(RouteRule::parse(&rule.method, &rule.path).map_err(|e| {
                        ValidationError::InvalidRoute {
                            method: rule.method.clone(),
                            pattern: rule.path.clone(),
                            message: e,
                        }
                    })?);
                }
                RouteTable::new(parsed)
            }
            None => RouteTable::default(),
        };

        Ok(ResolvedConfig {
            listen_addr: self.server.listen_addr.clone(),
            allowed_source_ips,
            external_api_key: self.auth.external_api_key.clone(),
            upstream_base_url: self.upstream.base_url.trim_end_matches('/').to_string(),
            upstream_key_header,
            upstream_key,
            verify_upstream_tls: self.upstream.verify_tls,
            upstream_timeout: Duration::from_secs(self.upstream.timeout_secs),
            trust_proxy_headers: self.server.trust_proxy_headers,
            real_ip_header: self.server.real_ip_header.to_ascii_lowercase(),
            unknown_paths_log: self.logging.unknown_paths_log.clone(),
            routes,
        })
    }
}

/// Canonical, process-wide configuration. Built once at startup and shared
/// read-only (behind `Arc`) with every request handler; nothing in the
/// pipeline mutates it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub listen_addr: String,
    pub allowed_source_ips: HashSet<IpAddr>,
    pub external_api_key: String,
    pub upstream_base_url: String,
    pub upstream_key_header: HeaderName,
    pub upstream_key: HeaderValue,
    pub verify_upstream_tls: bool,
    pub upstream_timeout: Duration,
    pub trust_proxy_headers: bool,
    /// Lower-cased proxy header name consulted for the client address.
    pub real_ip_header: String,
    pub unknown_paths_log: String,
    pub routes: RouteTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> GatewayConfig {
        GatewayConfig {
            firewall: FirewallConfig {
                allowed_source_ips: vec!["10.0.0.5".to_string(), "::1".to_string()],
            },
            auth: AuthConfig {
                external_api_key: "secret".to_string(),
            },
            upstream: UpstreamConfig {
                base_url: "https://controller.local/".to_string(),
                api_key: "upstream-key".to_string(),
                api_key_header: default_api_key_header(),
                verify_tls: true,
                timeout_secs: 20,
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            routes: None,
        }
    }

    #[test]
    fn resolve_trims_base_url_and_parses_ips() {
        let resolved = minimal().resolve().expect("valid config");
        assert_eq!(resolved.upstream_base_url, "https://controller.local");
        assert!(
            resolved
                .allowed_source_ips
                .contains(&"10.0.0.5".parse::<IpAddr>().unwrap())
        );
        assert_eq!(resolved.real_ip_header, "x-forwarded-for");
        assert_eq!(resolved.upstream_timeout, Duration::from_secs(20));
    }

    #[test]
    fn resolve_rejects_bad_source_ip() {
        let mut cfg = minimal();
        cfg.firewall.allowed_source_ips.push("not-an-ip".to_string());
        assert!(matches!(
            cfg.resolve(),
            Err(ValidationError::InvalidSourceIp { .. })
        ));
    }

    #[test]
    fn resolve_rejects_bad_header_name() {
        let mut cfg = minimal();
        cfg.upstream.api_key_header = "bad header\n".to_string();
        assert!(matches!(
            cfg.resolve(),
            Err(ValidationError::InvalidHeaderName { .. })
        ));
    }

    #[test]
    fn resolve_lowercases_real_ip_header() {
        let mut cfg = minimal();
        cfg.server.real_ip_header = "X-Real-IP".to_string();
        let resolved = cfg.resolve().expect("valid config");
        assert_eq!(resolved.real_ip_header, "x-real-ip");
    }

    #[test]
    fn resolve_accepts_route_override() {
        let mut cfg = minimal();
        cfg.routes = Some(vec![RouteRuleConfig {
            method: "GET".to_string(),
            path: "^/status$".to_string(),
        }]);
        let resolved = cfg.resolve().expect("valid config");
        assert!(resolved.routes.is_allowed(&http::Method::GET, "/status"));
        assert!(
            !resolved
                .routes
                .is_allowed(&http::Method::GET, "/proxy/network/integration/v1/sites")
        );
    }
}
