//! Metric producers polled on every export tick.
//!
//! # Responsibilities
//! - Translate one registry snapshot into metric descriptors
//! - Sample host resources for the system producer
//!
//! # Design Decisions
//! - Producers run in a fixed order: http, system, user, purchase, auth, latency
//! - Every producer reads the same snapshot, so one batch is internally consistent
//! - Counters that were never touched are still reported as zero

use crate::metrics::domain::*;
use crate::metrics::encoder::MetricDescriptor;
use crate::metrics::registry::{attributes, Attributes, MetricValue, RegistrySnapshot};
use crate::metrics::system::{HostSampler, SysinfoSampler};

/// Attribute key grouping metrics by producer. Kept distinct from the
/// encoder's `source` key, which always carries the configured source.
pub const CATEGORY_KEY: &str = "category";

/// Contributes descriptors for one concern.
pub trait MetricProducer: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>);
}

/// The standard producer list, in export order.
pub fn default_producers() -> Vec<Box<dyn MetricProducer>> {
    vec![
        Box::new(HttpProducer),
        Box::new(SystemProducer::new(SysinfoSampler::new())),
        Box::new(UserProducer),
        Box::new(PurchaseProducer),
        Box::new(AuthProducer),
        Box::new(LatencyProducer),
    ]
}

fn category(name: &str) -> Attributes {
    attributes([(CATEGORY_KEY, name)])
}

/// Request counters: the total plus one counter per tracked method.
pub struct HttpProducer;

impl MetricProducer for HttpProducer {
    fn name(&self) -> &'static str {
        "http"
    }

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        let all = method_attributes("ALL");
        out.push(
            MetricDescriptor::sum(HTTP_REQUESTS_TOTAL, "1", snapshot.counter(HTTP_REQUESTS_TOTAL, &all))
                .with_attributes(&all),
        );
        for (method, counter) in TRACKED_METHODS {
            let attrs = method_attributes(method);
            out.push(
                MetricDescriptor::sum(counter, "1", snapshot.counter(counter, &attrs))
                    .with_attributes(&attrs),
            );
        }
    }
}

/// Host CPU and memory utilization.
pub struct SystemProducer<S> {
    sampler: S,
}

impl<S: HostSampler> SystemProducer<S> {
    pub fn new(sampler: S) -> Self {
        Self { sampler }
    }
}

impl<S: HostSampler> MetricProducer for SystemProducer<S> {
    fn name(&self) -> &'static str {
        "system"
    }

    fn produce(&self, _snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        let usage = self.sampler.sample();
        let attrs = category("system");
        out.push(MetricDescriptor::gauge(SYSTEM_CPU_USAGE, "%", usage.cpu_percent).with_attributes(&attrs));
        out.push(
            MetricDescriptor::gauge(SYSTEM_MEMORY_USAGE, "%", usage.memory_percent).with_attributes(&attrs),
        );
    }
}

/// Signed-in user count.
pub struct UserProducer;

impl MetricProducer for UserProducer {
    fn name(&self) -> &'static str {
        "user"
    }

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        let active = snapshot
            .gauge(USER_ACTIVE_COUNT, &Attributes::new())
            .unwrap_or(MetricValue::Int(0));
        out.push(MetricDescriptor::gauge(USER_ACTIVE_COUNT, "1", active).with_attributes(&category("user")));
    }
}

/// Pizzas sold, failed, and revenue.
pub struct PurchaseProducer;

impl MetricProducer for PurchaseProducer {
    fn name(&self) -> &'static str {
        "purchase"
    }

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        let none = Attributes::new();
        let attrs = category("purchase");
        out.push(MetricDescriptor::sum(PIZZA_SOLD, "1", snapshot.counter(PIZZA_SOLD, &none)).with_attributes(&attrs));
        out.push(
            MetricDescriptor::sum(PIZZA_FAILED, "1", snapshot.counter(PIZZA_FAILED, &none)).with_attributes(&attrs),
        );
        out.push(
            MetricDescriptor::sum(PIZZA_REVENUE, "1", snapshot.total(PIZZA_REVENUE, &none)).with_attributes(&attrs),
        );
    }
}

/// Login outcomes.
pub struct AuthProducer;

impl MetricProducer for AuthProducer {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        let none = Attributes::new();
        let attrs = category("auth");
        for name in [AUTH_SUCCESSFUL_LOGINS, AUTH_FAILED_LOGINS] {
            out.push(MetricDescriptor::sum(name, "1", snapshot.counter(name, &none)).with_attributes(&attrs));
        }
    }
}

/// Per-endpoint request latency and factory latency.
pub struct LatencyProducer;

impl MetricProducer for LatencyProducer {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn produce(&self, snapshot: &RegistrySnapshot, out: &mut Vec<MetricDescriptor>) {
        for (attrs, value) in snapshot.gauges_named(REQUEST_LATENCY) {
            out.push(MetricDescriptor::gauge(REQUEST_LATENCY, "ms", value).with_attributes(attrs));
        }
        let pizza = snapshot
            .gauge(PIZZA_LATENCY, &Attributes::new())
            .unwrap_or(MetricValue::Int(0));
        out.push(MetricDescriptor::gauge(PIZZA_LATENCY, "ms", pizza).with_attributes(&category("latency")));
    }
}
