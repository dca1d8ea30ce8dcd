//! Request metrics interceptor.
//! Counts every request and records per-path latency.
//!
//! Latency runs from entry until the inner stack returns its response. It sits
//! outside log capture, so the figure covers the handler plus body buffering
//! and event sanitizing, but not writing the response to the socket.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::metrics::MetricsRegistry;

/// Records latency when dropped, so a cancelled or panicking handler
/// still reports how long it ran.
struct LatencyGuard {
    registry: Arc<MetricsRegistry>,
    path: String,
    start: Instant,
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        let millis = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.registry.record_latency(&self.path, millis);
    }
}

/// Counts the request on entry and records elapsed milliseconds under its
/// literal path once the inner service has produced a response.
pub async fn track_requests(
    State(registry): State<Arc<MetricsRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    registry.record_request(request.method().as_str());

    let _guard = LatencyGuard {
        registry: registry.clone(),
        path: request.uri().path().to_string(),
        start: Instant::now(),
    };

    next.run(request).await
}
