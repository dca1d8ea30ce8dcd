//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files. Keys
//! are camelCase so the recognized options read `metrics.apiKey`,
//! `logging.userId` and so on.

use serde::{Deserialize, Serialize};

/// Root configuration for the instrumented service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Metrics export settings.
    pub metrics: MetricsConfig,

    /// Remote log shipping settings.
    pub logging: LoggingConfig,

    /// Local (stdout) diagnostics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Total time budget for one request, in seconds.
    pub request_timeout_secs: u64,

    /// Largest request or response body the log shipper will capture.
    /// Larger bodies stream through untouched.
    pub max_captured_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_captured_body_bytes: 64 * 1024,
        }
    }
}

/// Metrics push configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsConfig {
    /// Push endpoint. Export is disabled while this is unset or empty.
    pub url: Option<String>,

    /// Bearer token for the push endpoint.
    pub api_key: String,

    /// Value of the `source` attribute stamped on every metric point.
    pub source: String,

    /// Interval between export ticks, in milliseconds.
    pub export_period_ms: u64,

    /// Per-request timeout for a push, in milliseconds.
    pub timeout_ms: u64,
}

impl MetricsConfig {
    /// The push endpoint, if one is configured.
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: String::new(),
            source: "jwt-pizza-service".to_string(),
            export_period_ms: 5_000,
            timeout_ms: 10_000,
        }
    }
}

/// Log shipping configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Push endpoint. Shipping is disabled while this is unset or empty.
    pub url: Option<String>,

    /// Account identifier, sent as the first half of the bearer token.
    pub user_id: String,

    /// API key, sent as the second half of the bearer token.
    pub api_key: String,

    /// Value of the `component` stream label.
    pub source: String,

    /// Per-request timeout for a push, in milliseconds.
    pub timeout_ms: u64,
}

impl LoggingConfig {
    /// The push endpoint, if one is configured.
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    /// Bearer credential in `userId:apiKey` form.
    pub fn credential(&self) -> String {
        format!("{}:{}", self.user_id, self.api_key)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            url: None,
            user_id: String::new(),
            api_key: String::new(),
            source: "jwt-pizza-service".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Output format for local diagnostics.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Local diagnostics configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
