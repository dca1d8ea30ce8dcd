//! Request pipeline interceptors.
//!
//! # Ordering
//! ```text
//! inbound  → track_requests → capture_exchange → handler
//! outbound ← track_requests ← capture_exchange ← handler
//! ```
//! Metrics see every request first; log capture sits closest to the handler
//! so it observes the final body and status.

pub mod instrumentation;
pub mod log_capture;

use axum::{middleware, Router};

use crate::telemetry::Telemetry;

pub use instrumentation::track_requests;
pub use log_capture::{capture_exchange, LogCapture};

/// Wrap `router` with the telemetry interceptors.
pub fn instrument(router: Router, telemetry: &Telemetry) -> Router {
    let capture = LogCapture {
        shipper: telemetry.shipper.clone(),
        max_body_bytes: telemetry.config.load().server.max_captured_body_bytes,
    };

    router
        .layer(middleware::from_fn_with_state(capture, capture_exchange))
        .layer(middleware::from_fn_with_state(
            telemetry.registry.clone(),
            track_requests,
        ))
}
