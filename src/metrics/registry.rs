//! In-process metric store.
//!
//! # Responsibilities
//! - Hold named counters, real-valued totals and gauges keyed by attribute set
//! - Accept updates from any task without blocking request handling
//! - Produce an immutable snapshot for one export tick
//!
//! # Design Decisions
//! - Counters are `AtomicU64` inside a sharded `DashMap`; the hot path is a
//!   shard read lock plus one atomic add
//! - Gauges are overwritten under the shard write lock (last write wins)
//! - Nothing is ever reset or removed; exports re-read cumulative state
//! - Snapshots are ordered (`BTreeMap`) so encoding the same state twice
//!   yields the same metric order

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Attribute set attached to a series. Ordered by key.
pub type Attributes = BTreeMap<String, String>;

/// Build an attribute set from key/value pairs.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Identity of one time series: metric name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub name: String,
    pub attributes: Attributes,
}

impl SeriesKey {
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}

/// A numeric observation, integer or real.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Double(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Int(v) => v as f64,
            MetricValue::Double(v) => v,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Double(v)
    }
}

/// Process-wide store of counters, totals and gauges.
///
/// Created once at startup and shared by `Arc` with the request
/// interceptors and the exporter.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<SeriesKey, AtomicU64>,
    totals: DashMap<SeriesKey, f64>,
    gauges: DashMap<SeriesKey, MetricValue>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to a counter, creating it at zero if absent.
    pub fn increment(&self, name: &str, delta: u64, attributes: Attributes) {
        let key = SeriesKey::new(name, attributes);
        if let Some(counter) = self.counters.get(&key) {
            counter.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(key)
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    /// Add a real amount to a cumulative total. Negative and non-finite
    /// amounts are ignored so the total stays monotonic.
    pub fn accumulate(&self, name: &str, amount: f64, attributes: Attributes) {
        if !amount.is_finite() || amount < 0.0 {
            tracing::debug!(metric = name, amount, "Ignoring non-monotonic total update");
            return;
        }
        *self
            .totals
            .entry(SeriesKey::new(name, attributes))
            .or_insert(0.0) += amount;
    }

    /// Overwrite a gauge.
    pub fn set_gauge(&self, name: &str, value: impl Into<MetricValue>, attributes: Attributes) {
        self.gauges
            .insert(SeriesKey::new(name, attributes), value.into());
    }

    /// Add `delta` to a gauge in place, creating it at zero if absent.
    pub fn adjust_gauge(&self, name: &str, delta: i64, attributes: Attributes) {
        let mut entry = self
            .gauges
            .entry(SeriesKey::new(name, attributes))
            .or_insert(MetricValue::Int(0));
        *entry = match *entry {
            MetricValue::Int(v) => MetricValue::Int(v.saturating_add(delta)),
            MetricValue::Double(v) => MetricValue::Double(v + delta as f64),
        };
    }

    /// Copy the current state for one export tick.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            counters: self
                .counters
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            totals: self
                .totals
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

/// Immutable view of the registry at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub counters: BTreeMap<SeriesKey, u64>,
    pub totals: BTreeMap<SeriesKey, f64>,
    pub gauges: BTreeMap<SeriesKey, MetricValue>,
}

impl RegistrySnapshot {
    /// Counter value, zero when the series was never incremented.
    pub fn counter(&self, name: &str, attributes: &Attributes) -> u64 {
        self.counters
            .get(&SeriesKey::new(name, attributes.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total value, zero when nothing was accumulated.
    pub fn total(&self, name: &str, attributes: &Attributes) -> f64 {
        self.totals
            .get(&SeriesKey::new(name, attributes.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn gauge(&self, name: &str, attributes: &Attributes) -> Option<MetricValue> {
        self.gauges
            .get(&SeriesKey::new(name, attributes.clone()))
            .copied()
    }

    /// Every gauge series with the given name, in attribute order.
    pub fn gauges_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a Attributes, MetricValue)> + 'a {
        self.gauges
            .iter()
            .filter(move |(key, _)| key.name == name)
            .map(|(key, value)| (&key.attributes, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn increment_creates_at_zero_and_accumulates() {
        let registry = MetricsRegistry::new();
        let get = attributes([("method", "GET")]);

        assert_eq!(registry.snapshot().counter("http_get_total", &get), 0);

        registry.increment("http_get_total", 1, get.clone());
        registry.increment("http_get_total", 2, get.clone());
        registry.increment("http_get_total", 1, attributes([("method", "PUT")]));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counter("http_get_total", &get), 3);
        assert_eq!(snapshot.counters.len(), 2);
    }

    #[test]
    fn gauge_is_last_write_wins() {
        let registry = MetricsRegistry::new();
        let endpoint = attributes([("endpoint", "/api/order")]);

        registry.set_gauge("request_latency", 12u64, endpoint.clone());
        registry.set_gauge("request_latency", 7u64, endpoint.clone());

        assert_eq!(
            registry.snapshot().gauge("request_latency", &endpoint),
            Some(MetricValue::Int(7))
        );
    }

    #[test]
    fn adjust_gauge_moves_both_ways() {
        let registry = MetricsRegistry::new();
        registry.adjust_gauge("user_active_count", 1, Attributes::new());
        registry.adjust_gauge("user_active_count", 1, Attributes::new());
        registry.adjust_gauge("user_active_count", -1, Attributes::new());

        assert_eq!(
            registry.snapshot().gauge("user_active_count", &Attributes::new()),
            Some(MetricValue::Int(1))
        );
    }

    #[test]
    fn totals_ignore_negative_and_non_finite_amounts() {
        let registry = MetricsRegistry::new();
        registry.accumulate("pizza_revenue", 0.05, Attributes::new());
        registry.accumulate("pizza_revenue", -1.0, Attributes::new());
        registry.accumulate("pizza_revenue", f64::NAN, Attributes::new());
        registry.accumulate("pizza_revenue", 0.0038, Attributes::new());

        let total = registry.snapshot().total("pizza_revenue", &Attributes::new());
        assert!((total - 0.0538).abs() < 1e-12);
    }

    #[test]
    fn snapshot_is_detached_from_later_updates() {
        let registry = MetricsRegistry::new();
        registry.increment("http_requests_total", 1, Attributes::new());
        let before = registry.snapshot();
        registry.increment("http_requests_total", 1, Attributes::new());

        assert_eq!(before.counter("http_requests_total", &Attributes::new()), 1);
        assert_eq!(
            registry.snapshot().counter("http_requests_total", &Attributes::new()),
            2
        );
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        registry.increment("http_requests_total", 1, attributes([("method", "ALL")]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            registry
                .snapshot()
                .counter("http_requests_total", &attributes([("method", "ALL")])),
            8_000
        );
    }

    #[test]
    fn gauges_named_filters_by_name() {
        let registry = MetricsRegistry::new();
        registry.set_gauge("request_latency", 3u64, attributes([("endpoint", "/a")]));
        registry.set_gauge("request_latency", 4u64, attributes([("endpoint", "/b")]));
        registry.set_gauge("pizza_latency", 9u64, Attributes::new());

        let snapshot = registry.snapshot();
        let endpoints: Vec<_> = snapshot
            .gauges_named("request_latency")
            .map(|(attrs, value)| (attrs["endpoint"].clone(), value))
            .collect();
        assert_eq!(
            endpoints,
            vec![
                ("/a".to_string(), MetricValue::Int(3)),
                ("/b".to_string(), MetricValue::Int(4)),
            ]
        );
    }
}
