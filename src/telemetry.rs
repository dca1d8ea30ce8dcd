//! Process-wide telemetry handles.
//!
//! One [`Telemetry`] is built at startup and cloned into the HTTP layer and
//! business code. It owns the metrics registry, the log shipper and the live
//! configuration both of them read.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SharedConfig;
use crate::logs::LogShipper;
use crate::metrics::{default_producers, MetricProducer, MetricsExporter, MetricsRegistry};

#[derive(Clone)]
pub struct Telemetry {
    pub registry: Arc<MetricsRegistry>,
    pub shipper: LogShipper,
    pub config: SharedConfig,
}

impl Telemetry {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            registry: Arc::new(MetricsRegistry::new()),
            shipper: LogShipper::new(config.clone()),
            config,
        }
    }

    /// Exporter over this registry with the standard producer set.
    pub fn exporter(&self) -> MetricsExporter {
        self.exporter_with(default_producers())
    }

    pub fn exporter_with(&self, producers: Vec<Box<dyn MetricProducer>>) -> MetricsExporter {
        MetricsExporter::new(self.registry.clone(), self.config.clone(), producers)
    }

    /// Spawn the periodic exporter; it exits when `shutdown` fires.
    pub fn spawn_exporter(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let exporter = self.exporter();
        tokio::spawn(exporter.run(shutdown))
    }
}
