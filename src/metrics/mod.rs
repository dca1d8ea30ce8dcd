//! Metrics aggregation and export.
//!
//! # Data Flow
//! ```text
//! request interceptor / business handlers
//!     → registry.rs (counters, totals, gauges; shared via Arc)
//!
//! every export tick (exporter.rs, own task):
//!     registry.snapshot()
//!     → producers.rs (http, system, user, purchase, auth, latency)
//!     → encoder.rs (descriptors → wire batch)
//!     → HTTP POST to metrics.url
//! ```
//!
//! # Design Decisions
//! - Counters are cumulative and never reset, so a dropped batch loses nothing
//! - Batches are built fresh per tick and discarded after the push

pub mod domain;
pub mod encoder;
pub mod exporter;
pub mod producers;
pub mod registry;
pub mod system;

pub use encoder::{MetricBatch, MetricDescriptor, MetricEncoder, MetricKind};
pub use exporter::{ExportError, ExportOutcome, MetricsExporter};
pub use producers::{default_producers, MetricProducer};
pub use registry::{attributes, Attributes, MetricValue, MetricsRegistry, RegistrySnapshot};
