//! Periodic metrics push.
//!
//! # Responsibilities
//! - Poll producers on a fixed period and encode one batch per tick
//! - POST the batch with bearer authorization
//! - Contain every failure: log it, drop the batch, keep ticking
//!
//! # Design Decisions
//! - Ticks never overlap: the loop awaits each push and skips ticks that
//!   elapsed meanwhile, so a slow backend cannot pile up requests
//! - The loop owns its own task; request handling never waits on it
//! - Config is re-read every tick, so a reload changes endpoint and key
//!   without a restart
//! - Missing endpoint warns once, not per tick

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::SharedConfig;
use crate::metrics::encoder::{MetricBatch, MetricDescriptor, MetricEncoder};
use crate::metrics::producers::MetricProducer;
use crate::metrics::registry::MetricsRegistry;

/// Failure to deliver one batch.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("metrics push failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metrics endpoint rejected batch with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No endpoint configured; nothing was sent.
    Disabled,
    /// The backend accepted a batch of this many metrics.
    Delivered { metrics: usize },
    /// The push failed and the batch was dropped.
    Failed,
}

/// Scheduled exporter reading the registry through producers.
pub struct MetricsExporter {
    registry: Arc<MetricsRegistry>,
    config: SharedConfig,
    producers: Vec<Box<dyn MetricProducer>>,
    client: reqwest::Client,
    warned_unconfigured: AtomicBool,
}

impl MetricsExporter {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        config: SharedConfig,
        producers: Vec<Box<dyn MetricProducer>>,
    ) -> Self {
        Self {
            registry,
            config,
            producers,
            client: reqwest::Client::new(),
            warned_unconfigured: AtomicBool::new(false),
        }
    }

    /// Run the export loop until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_millis(self.config.load().metrics.export_period_ms.max(1));
        tracing::info!(period_ms = period.as_millis() as u64, "Metrics exporter starting");

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the first export waits one period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Metrics exporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One export cycle. Never fails; errors are logged and the batch dropped.
    pub async fn tick(&self) -> ExportOutcome {
        match self.export_once().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping metrics batch");
                ExportOutcome::Failed
            }
        }
    }

    /// Build and push one batch.
    pub async fn export_once(&self) -> Result<ExportOutcome, ExportError> {
        let config = self.config.load_full();
        let metrics = &config.metrics;

        let Some(url) = metrics.endpoint() else {
            if !self.warned_unconfigured.swap(true, Ordering::Relaxed) {
                tracing::warn!("metrics.url is not configured; metrics export disabled");
            }
            return Ok(ExportOutcome::Disabled);
        };
        self.warned_unconfigured.store(false, Ordering::Relaxed);

        let batch = self.collect(&MetricEncoder::new(metrics.source.clone()));
        let count = batch.metric_count();

        let response = self
            .client
            .post(url)
            .bearer_auth(&metrics.api_key)
            .timeout(Duration::from_millis(metrics.timeout_ms))
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(metrics = count, "Metrics batch delivered");
        Ok(ExportOutcome::Delivered { metrics: count })
    }

    /// Snapshot the registry and run every producer into one batch.
    pub fn collect(&self, encoder: &MetricEncoder) -> MetricBatch {
        let snapshot = self.registry.snapshot();
        let mut descriptors: Vec<MetricDescriptor> = Vec::new();
        for producer in &self.producers {
            let before = descriptors.len();
            producer.produce(&snapshot, &mut descriptors);
            tracing::trace!(
                producer = producer.name(),
                metrics = descriptors.len() - before,
                "Producer polled"
            );
        }
        encoder.encode(&descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, ServiceConfig};
    use crate::metrics::encoder::MetricData;
    use crate::metrics::producers::HttpProducer;

    fn exporter(config: ServiceConfig) -> MetricsExporter {
        MetricsExporter::new(
            Arc::new(MetricsRegistry::new()),
            shared(config),
            vec![Box::new(HttpProducer)],
        )
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_a_quiet_no_op() {
        let exporter = exporter(ServiceConfig::default());
        exporter.registry.record_request("GET");

        assert_eq!(exporter.export_once().await.unwrap(), ExportOutcome::Disabled);
        assert!(exporter.warned_unconfigured.load(Ordering::Relaxed));
        assert_eq!(exporter.tick().await, ExportOutcome::Disabled);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_without_touching_counters() {
        let mut config = ServiceConfig::default();
        // Port 9 (discard) on loopback is closed in test environments.
        config.metrics.url = Some("http://127.0.0.1:9/push".into());
        config.metrics.api_key = "k".into();
        let exporter = exporter(config);
        exporter.registry.record_request("POST");

        assert_eq!(exporter.tick().await, ExportOutcome::Failed);
        assert!(!exporter.warned_unconfigured.load(Ordering::Relaxed));

        let batch = exporter.collect(&MetricEncoder::new("test"));
        assert_eq!(batch.metric_count(), 5);
    }

    #[tokio::test]
    async fn missing_endpoint_warning_rearms_after_reload() {
        let config = shared(ServiceConfig::default());
        let exporter = MetricsExporter::new(
            Arc::new(MetricsRegistry::new()),
            config.clone(),
            vec![Box::new(HttpProducer)],
        );

        assert_eq!(exporter.tick().await, ExportOutcome::Disabled);
        assert!(exporter.warned_unconfigured.load(Ordering::Relaxed));

        let mut configured = ServiceConfig::default();
        configured.metrics.url = Some("http://127.0.0.1:9/push".into());
        config.store(Arc::new(configured));
        assert_eq!(exporter.tick().await, ExportOutcome::Failed);
        assert!(!exporter.warned_unconfigured.load(Ordering::Relaxed));

        config.store(Arc::new(ServiceConfig::default()));
        assert_eq!(exporter.tick().await, ExportOutcome::Disabled);
        assert!(exporter.warned_unconfigured.load(Ordering::Relaxed));
    }

    #[test]
    fn collecting_twice_differs_only_in_timestamps() {
        let exporter = exporter(ServiceConfig::default());
        exporter.registry.record_request("DELETE");
        let encoder = MetricEncoder::new("test");

        let strip = |mut batch: MetricBatch| {
            for scope in batch.resource_metrics.iter_mut().flat_map(|r| r.scope_metrics.iter_mut()) {
                for metric in &mut scope.metrics {
                    let points = match &mut metric.data {
                        MetricData::Sum(sum) => &mut sum.data_points,
                        MetricData::Gauge(gauge) => &mut gauge.data_points,
                    };
                    points.iter_mut().for_each(|p| p.time_unix_nano = 0);
                }
            }
            batch
        };

        assert_eq!(strip(exporter.collect(&encoder)), strip(exporter.collect(&encoder)));
    }
}
