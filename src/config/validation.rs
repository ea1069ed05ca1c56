//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, windows > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and collect the failures.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.token.ttl_days <= 0 {
        errors.push(ValidationError::new("token.ttl_days", "must be positive"));
    }
    if config.token.secret_env.trim().is_empty() {
        errors.push(ValidationError::new("token.secret_env", "must name an environment variable"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be positive"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be positive"));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be positive"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", config.observability.log_format),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.token.ttl_days = 0;
        config.rate_limit.window_secs = 0;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "token.ttl_days",
                "rate_limit.window_secs",
                "observability.log_format",
            ]
        );
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let mut config = ServiceConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
