//! Metric names and the recording hooks business handlers call.

use crate::metrics::registry::{attributes, Attributes, MetricsRegistry};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_GET_TOTAL: &str = "http_get_total";
pub const HTTP_PUT_TOTAL: &str = "http_put_total";
pub const HTTP_POST_TOTAL: &str = "http_post_total";
pub const HTTP_DELETE_TOTAL: &str = "http_delete_total";

pub const SYSTEM_CPU_USAGE: &str = "system_cpu_usage";
pub const SYSTEM_MEMORY_USAGE: &str = "system_memory_usage";

pub const USER_ACTIVE_COUNT: &str = "user_active_count";

pub const PIZZA_SOLD: &str = "pizza_sold";
pub const PIZZA_FAILED: &str = "pizza_failed";
pub const PIZZA_REVENUE: &str = "pizza_revenue";

pub const AUTH_SUCCESSFUL_LOGINS: &str = "auth_successful_logins";
pub const AUTH_FAILED_LOGINS: &str = "auth_failed_logins";

pub const REQUEST_LATENCY: &str = "request_latency";
pub const PIZZA_LATENCY: &str = "pizza_latency";

/// Methods with a dedicated request counter, paired with the counter name.
pub const TRACKED_METHODS: [(&str, &str); 4] = [
    ("GET", HTTP_GET_TOTAL),
    ("PUT", HTTP_PUT_TOTAL),
    ("POST", HTTP_POST_TOTAL),
    ("DELETE", HTTP_DELETE_TOTAL),
];

/// Attribute set `{method: <method>}`.
pub fn method_attributes(method: &str) -> Attributes {
    attributes([("method", method)])
}

/// Attribute set `{endpoint: <path>}`.
pub fn endpoint_attributes(path: &str) -> Attributes {
    attributes([("endpoint", path)])
}

impl MetricsRegistry {
    /// Count one inbound request toward the total and, for tracked methods,
    /// the per-method counter. Other methods only count toward the total.
    pub fn record_request(&self, method: &str) {
        self.increment(HTTP_REQUESTS_TOTAL, 1, method_attributes("ALL"));
        if let Some((tracked, counter)) = TRACKED_METHODS
            .iter()
            .find(|(tracked, _)| *tracked == method)
        {
            self.increment(counter, 1, method_attributes(tracked));
        }
    }

    /// Record how long the last request to `path` took.
    pub fn record_latency(&self, path: &str, millis: u64) {
        self.set_gauge(REQUEST_LATENCY, millis, endpoint_attributes(path));
    }

    pub fn user_signed_in(&self) {
        self.adjust_gauge(USER_ACTIVE_COUNT, 1, Attributes::new());
    }

    pub fn user_signed_out(&self) {
        self.adjust_gauge(USER_ACTIVE_COUNT, -1, Attributes::new());
    }

    pub fn login_succeeded(&self) {
        self.increment(AUTH_SUCCESSFUL_LOGINS, 1, Attributes::new());
    }

    pub fn login_failed(&self) {
        self.increment(AUTH_FAILED_LOGINS, 1, Attributes::new());
    }

    pub fn pizzas_sold(&self, count: u64) {
        self.increment(PIZZA_SOLD, count, Attributes::new());
    }

    pub fn pizzas_failed(&self, count: u64) {
        self.increment(PIZZA_FAILED, count, Attributes::new());
    }

    pub fn add_revenue(&self, amount: f64) {
        self.accumulate(PIZZA_REVENUE, amount, Attributes::new());
    }

    /// Latency of the last call to the pizza factory.
    pub fn set_pizza_latency(&self, millis: u64) {
        self.set_gauge(PIZZA_LATENCY, millis, Attributes::new());
    }
}
