//! Asynchronous log shipping.
//!
//! # Responsibilities
//! - Build sanitized log events at observation time
//! - Push them to `logging.url` off the calling task
//! - Swallow and locally log every delivery failure
//!
//! # Design Decisions
//! - `log` never blocks and never fails: the push runs on a spawned task
//! - Redaction runs on the serialized payload, so any field named
//!   `password` anywhere in it is masked
//! - Missing endpoint warns once, then events are dropped before they are
//!   built
//! - At most `MAX_IN_FLIGHT_PUSHES` pushes run at once; extra events are
//!   dropped

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::clock;
use crate::config::SharedConfig;
use crate::logs::event::{HttpExchange, LogBatch, LogEvent, LogLabels, LogLevel};
use crate::logs::redact::redact;

/// Concurrent pushes allowed before new events are dropped.
pub const MAX_IN_FLIGHT_PUSHES: usize = 256;

/// Failure to deliver one log batch.
#[derive(Debug, Error)]
pub enum ShipError {
    #[error("log payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("log push failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("logging endpoint rejected batch with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Ships structured events to the remote log store.
///
/// Cheap to clone; clones share the HTTP client and config.
#[derive(Clone)]
pub struct LogShipper {
    config: SharedConfig,
    client: reqwest::Client,
    warned_unconfigured: Arc<AtomicBool>,
    in_flight: Arc<Semaphore>,
}

impl LogShipper {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            warned_unconfigured: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT_PUSHES)),
        }
    }

    /// Record one request/response exchange at a level derived from its status.
    pub fn http_exchange(&self, exchange: &HttpExchange) {
        self.log(LogLevel::from_status(exchange.status_code), "http", exchange);
    }

    /// Record a database query.
    pub fn db_query(&self, query: &str) {
        self.log(LogLevel::Info, "db", &query);
    }

    /// Record a request sent to the pizza factory.
    pub fn factory_request<T: Serialize>(&self, order: &T) {
        self.log(LogLevel::Info, "factory", order);
    }

    /// Record an error that escaped every handler.
    pub fn unhandled_error(&self, message: &str, status: u16) {
        self.log(
            LogLevel::Error,
            "unhandledError",
            &json!({ "message": message, "status": status }),
        );
    }

    /// Build an event now and push it in the background.
    pub fn log<T: Serialize + ?Sized>(&self, level: LogLevel, kind: &str, data: &T) {
        if self.config.load().logging.endpoint().is_none() {
            self.warn_unconfigured();
            return;
        }

        let event = match self.event(level, kind, data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, kind, "Dropping log event");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(kind, "No async runtime; dropping log event");
            return;
        };

        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            tracing::warn!(level = %level, kind, "Too many log pushes in flight; dropping log event");
            return;
        };

        let shipper = self.clone();
        let kind = kind.to_string();
        runtime.spawn(async move {
            if let Err(e) = shipper.ship(event).await {
                tracing::warn!(error = %e, level = %level, kind = %kind, "Failed to ship log event");
            }
            drop(permit);
        });
    }

    fn warn_unconfigured(&self) {
        if !self.warned_unconfigured.swap(true, Ordering::Relaxed) {
            tracing::warn!("logging.url is not configured; log shipping disabled");
        }
    }

    /// Serialize and sanitize `data` into an event stamped now.
    pub fn event<T: Serialize + ?Sized>(
        &self,
        level: LogLevel,
        kind: &str,
        data: &T,
    ) -> Result<LogEvent, ShipError> {
        let payload = redact(&serde_json::to_string(data)?);
        Ok(LogEvent {
            labels: LogLabels {
                component: self.config.load().logging.source.clone(),
                level,
                kind: kind.to_string(),
            },
            timestamp: clock::unix_nanos(),
            payload,
        })
    }

    /// Push one event. Returns `Ok(false)` when no endpoint is configured.
    pub async fn ship(&self, event: LogEvent) -> Result<bool, ShipError> {
        let config = self.config.load_full();
        let logging = &config.logging;

        let Some(url) = logging.endpoint() else {
            self.warn_unconfigured();
            return Ok(false);
        };
        self.warned_unconfigured.store(false, Ordering::Relaxed);

        let response = self
            .client
            .post(url)
            .bearer_auth(logging.credential())
            .timeout(Duration::from_millis(logging.timeout_ms))
            .json(&LogBatch::from(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShipError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, ServiceConfig};

    #[test]
    fn event_is_sanitized_and_labelled() {
        let mut config = ServiceConfig::default();
        config.logging.source = "pizza-test".into();
        let shipper = LogShipper::new(shared(config));

        let exchange = HttpExchange {
            authorized: false,
            path: "/api/auth".into(),
            method: "PUT".into(),
            status_code: 404,
            req_body: Some(r#"{"email":"x@jwt.com","password":"bad"}"#.into()),
            res_body: Some(r#"{"message":"unknown user"}"#.into()),
        };
        let event = shipper.event(LogLevel::Warn, "http", &exchange).unwrap();

        assert_eq!(event.labels.component, "pizza-test");
        assert_eq!(event.labels.kind, "http");
        assert!(event.timestamp > 0);
        assert!(!event.payload.contains("bad"));

        let payload: serde_json::Value = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(payload["reqBody"], r#"{"email":"x@jwt.com","password":"*****"}"#);
        assert_eq!(payload["statusCode"], 404);
    }

    #[tokio::test]
    async fn unconfigured_endpoint_drops_quietly() {
        let shipper = LogShipper::new(shared(ServiceConfig::default()));
        let event = shipper.event(LogLevel::Info, "db", "SELECT 1").unwrap();

        assert!(!shipper.ship(event.clone()).await.unwrap());
        assert!(shipper.warned_unconfigured.load(Ordering::Relaxed));
        assert!(!shipper.ship(event).await.unwrap());
    }

    #[test]
    fn log_outside_runtime_does_not_panic() {
        let mut config = ServiceConfig::default();
        config.logging.url = Some("http://127.0.0.1:9/push".into());
        let shipper = LogShipper::new(shared(config));
        shipper.unhandled_error("boom", 500);
    }

    #[tokio::test]
    async fn unconfigured_log_is_dropped_before_spawning() {
        let shipper = LogShipper::new(shared(ServiceConfig::default()));
        shipper.db_query("SELECT * FROM dinerOrder");

        assert!(shipper.warned_unconfigured.load(Ordering::Relaxed));
        assert_eq!(shipper.in_flight.available_permits(), MAX_IN_FLIGHT_PUSHES);
    }

    #[tokio::test]
    async fn full_push_budget_drops_new_events() {
        let mut config = ServiceConfig::default();
        config.logging.url = Some("http://127.0.0.1:9/push".into());
        let shipper = LogShipper::new(shared(config));
        let _held = shipper
            .in_flight
            .clone()
            .acquire_many_owned(MAX_IN_FLIGHT_PUSHES as u32)
            .await
            .unwrap();

        shipper.db_query("SELECT 1");
        assert_eq!(shipper.in_flight.available_permits(), 0);
    }

    #[tokio::test]
    async fn missing_endpoint_warning_rearms_after_reload() {
        let config = shared(ServiceConfig::default());
        let shipper = LogShipper::new(config.clone());
        let event = shipper.event(LogLevel::Info, "db", "SELECT 1").unwrap();

        assert!(!shipper.ship(event.clone()).await.unwrap());
        assert!(shipper.warned_unconfigured.load(Ordering::Relaxed));

        let mut configured = ServiceConfig::default();
        configured.logging.url = Some("http://127.0.0.1:9/push".into());
        config.store(Arc::new(configured));
        assert!(shipper.ship(event.clone()).await.is_err());
        assert!(!shipper.warned_unconfigured.load(Ordering::Relaxed));

        config.store(Arc::new(ServiceConfig::default()));
        assert!(!shipper.ship(event).await.unwrap());
        assert!(shipper.warned_unconfigured.load(Ordering::Relaxed));
    }
}
