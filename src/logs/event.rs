//! Log event model and its push wire format.
//!
//! ```text
//! {streams:[{stream:{component, level, type},
//!            values:[["<ns timestamp>", "<sanitized JSON>"]]}]}
//! ```

use serde::{Deserialize, Serialize};

/// Severity label on a shipped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// 5xx is an error, 4xx a warning, anything else informational.
    pub fn from_status(status: u16) -> Self {
        match status {
            500.. => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream labels of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLabels {
    pub component: String,
    pub level: LogLevel,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A single sanitized log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub labels: LogLabels,
    /// Nanoseconds since the Unix epoch, taken at observation time.
    pub timestamp: u64,
    /// Redacted JSON text.
    pub payload: String,
}

/// Push body carrying events, one stream per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    pub streams: Vec<LogStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStream {
    pub stream: LogLabels,
    pub values: Vec<[String; 2]>,
}

impl From<LogEvent> for LogBatch {
    fn from(event: LogEvent) -> Self {
        LogBatch {
            streams: vec![LogStream {
                stream: event.labels,
                values: vec![[event.timestamp.to_string(), event.payload]],
            }],
        }
    }
}

/// Metadata captured from one request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpExchange {
    /// Whether the request carried an Authorization header.
    pub authorized: bool,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res_body: Option<String>,
}
