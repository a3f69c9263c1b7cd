use std::net::SocketAddr;

use http::HeaderName;
use url::Url;

use crate::config::models::GatewayConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid allowed source IP '{value}'")]
    InvalidSourceIp { value: String },

    #[error("Invalid header name '{value}'")]
    InvalidHeaderName { value: String },

    #[error("Invalid route rule {method} '{pattern}': {message}")]
    InvalidRoute {
        method: String,
        pattern: String,
        message: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.server.listen_addr) {
            errors.push(e);
        }

        if config.firewall.allowed_source_ips.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "firewall.allowed_source_ips".to_string(),
            });
        }
        for ip in &config.firewall.allowed_source_ips {
            if ip.parse::<std::net::IpAddr>().is_err() {
                errors.push(ValidationError::InvalidSourceIp { value: ip.clone() });
            }
        }

        if config.auth.external_api_key.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "auth.external_api_key".to_string(),
            });
        }

        errors.extend(Self::validate_upstream(config));

        if let Some(routes) = &config.routes {
            for rule in routes {
                if let Err(e) = crate::core::routes::RouteRule::parse(&rule.method, &rule.path) {
                    errors.push(ValidationError::InvalidRoute {
                        method: rule.method.clone(),
                        pattern: rule.path.clone(),
                        message: e,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8080' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_upstream(config: &GatewayConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let upstream = &config.upstream;

        match Url::parse(&upstream.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::InvalidField {
                field: "upstream.base_url".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidField {
                field: "upstream.base_url".to_string(),
                message: e.to_string(),
            }),
        }

        if upstream.api_key.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "upstream.api_key".to_string(),
            });
        }

        if HeaderName::from_bytes(upstream.api_key_header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName {
                value: upstream.api_key_header.clone(),
            });
        }

        if upstream.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        errors
    }

    /// Format multiple validation errors into a readable message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let messages: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {e}", i + 1))
            .collect();
        format!(
            "Found {} validation error(s):\n{}",
            errors.len(),
            messages.join("\n")
        )
    }
}
