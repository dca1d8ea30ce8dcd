//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (periods > 0, addresses parse)
//! - Check that configured endpoints are absolute http(s) URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - An unset endpoint is valid: it disables that export path

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} is set but {credential} is empty")]
    MissingCredential {
        field: &'static str,
        credential: &'static str,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("server.bindAddress is not a socket address: {0}")]
    InvalidBindAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        ));
    }

    if let Some(url) = config.metrics.endpoint() {
        check_url("metrics.url", url, &mut errors);
        if config.metrics.api_key.is_empty() {
            errors.push(ValidationError::MissingCredential {
                field: "metrics.url",
                credential: "metrics.apiKey",
            });
        }
    }
    if config.metrics.export_period_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "metrics.exportPeriodMs",
        });
    }
    if config.metrics.timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "metrics.timeoutMs",
        });
    }

    if let Some(url) = config.logging.endpoint() {
        check_url("logging.url", url, &mut errors);
        if config.logging.api_key.is_empty() {
            errors.push(ValidationError::MissingCredential {
                field: "logging.url",
                credential: "logging.apiKey",
            });
        }
    }
    if config.logging.timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "logging.timeoutMs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
