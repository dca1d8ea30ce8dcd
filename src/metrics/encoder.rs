//! Metric batch encoding.
//!
//! Turns metric descriptors into the resource → scope → metrics JSON envelope
//! accepted by the metrics backend:
//!
//! ```text
//! {resourceMetrics:[{scopeMetrics:[{metrics:[
//!     {name, unit, sum|gauge:{dataPoints:[{asInt|asDouble, timeUnixNano, attributes}],
//!                             aggregationTemporality?, isMonotonic?}}
//! ]}]}]}
//! ```
//!
//! # Design Decisions
//! - Integral values encode as `asInt`, everything else as `asDouble`
//! - The configured source is the first attribute of every point and cannot
//!   be overridden by a caller attribute of the same key
//! - Each point is timestamped when it is encoded, not once per batch
//! - A non-finite value drops that metric only

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock;
use crate::metrics::registry::{Attributes, MetricValue};

/// Attribute key carrying the configured source.
pub const SOURCE_KEY: &str = "source";

/// 2^63: integral values below this magnitude fit in an `i64`.
const MAX_INT_AS_F64: f64 = 9_223_372_036_854_775_808.0;

/// Metric kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Cumulative, monotonic sum.
    Sum,
    /// Instantaneous value.
    Gauge,
}

/// One metric as contributed by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub unit: String,
    pub kind: MetricKind,
    pub value: MetricValue,
    pub attributes: Attributes,
}

impl MetricDescriptor {
    pub fn sum(name: impl Into<String>, unit: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self::new(name, unit, MetricKind::Sum, value.into())
    }

    pub fn gauge(name: impl Into<String>, unit: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self::new(name, unit, MetricKind::Gauge, value.into())
    }

    fn new(name: impl Into<String>, unit: impl Into<String>, kind: MetricKind, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            kind,
            value,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: &Attributes) -> Self {
        self.attributes
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Errors raised while encoding a single metric.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("metric {name} has non-finite value {value}")]
    NonFinite { name: String, value: f64 },
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One export tick's worth of metrics in the wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBatch {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub data: MetricData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricData {
    Sum(Sum),
    Gauge(Gauge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    pub data_points: Vec<DataPoint>,
    pub aggregation_temporality: AggregationTemporality,
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationTemporality {
    #[serde(rename = "AGGREGATION_TEMPORALITY_CUMULATIVE")]
    Cumulative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(flatten)]
    pub value: PointValue,
    pub time_unix_nano: u64,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointValue {
    #[serde(rename = "asInt")]
    AsInt(i64),
    #[serde(rename = "asDouble")]
    AsDouble(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

impl Metric {
    pub fn data_points(&self) -> &[DataPoint] {
        match &self.data {
            MetricData::Sum(sum) => &sum.data_points,
            MetricData::Gauge(gauge) => &gauge.data_points,
        }
    }
}

impl MetricBatch {
    /// All metrics in envelope order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|r| r.scope_metrics.iter())
            .flat_map(|s| s.metrics.iter())
    }

    pub fn metric_count(&self) -> usize {
        self.metrics().count()
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encodes descriptors into a [`MetricBatch`], stamping the configured source.
#[derive(Debug, Clone)]
pub struct MetricEncoder {
    source: String,
}

impl MetricEncoder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Encode every descriptor, skipping (and logging) the ones that cannot
    /// be represented.
    pub fn encode(&self, descriptors: &[MetricDescriptor]) -> MetricBatch {
        let metrics = descriptors
            .iter()
            .filter_map(|descriptor| match self.encode_metric(descriptor) {
                Ok(metric) => Some(metric),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping metric");
                    None
                }
            })
            .collect();

        MetricBatch {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics { metrics }],
            }],
        }
    }

    /// Encode a single descriptor.
    pub fn encode_metric(&self, descriptor: &MetricDescriptor) -> Result<Metric, EncodeError> {
        let value = point_value(&descriptor.name, descriptor.value)?;
        let point = DataPoint {
            value,
            time_unix_nano: clock::unix_nanos(),
            attributes: self.point_attributes(&descriptor.attributes),
        };

        let data = match descriptor.kind {
            MetricKind::Sum => MetricData::Sum(Sum {
                data_points: vec![point],
                aggregation_temporality: AggregationTemporality::Cumulative,
                is_monotonic: true,
            }),
            MetricKind::Gauge => MetricData::Gauge(Gauge {
                data_points: vec![point],
            }),
        };

        Ok(Metric {
            name: descriptor.name.clone(),
            unit: descriptor.unit.clone(),
            data,
        })
    }

    fn point_attributes(&self, attributes: &Attributes) -> Vec<KeyValue> {
        std::iter::once(key_value(SOURCE_KEY, &self.source))
            .chain(
                attributes
                    .iter()
                    .filter(|(key, _)| key.as_str() != SOURCE_KEY)
                    .map(|(key, value)| key_value(key, value)),
            )
            .collect()
    }
}

fn key_value(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: AnyValue {
            string_value: value.to_string(),
        },
    }
}

fn point_value(name: &str, value: MetricValue) -> Result<PointValue, EncodeError> {
    match value {
        MetricValue::Int(v) => Ok(PointValue::AsInt(v)),
        MetricValue::Double(v) if !v.is_finite() => Err(EncodeError::NonFinite {
            name: name.to_string(),
            value: v,
        }),
        MetricValue::Double(v) if v.fract() == 0.0 && v.abs() < MAX_INT_AS_F64 => {
            Ok(PointValue::AsInt(v as i64))
        }
        MetricValue::Double(v) => Ok(PointValue::AsDouble(v)),
    }
}
