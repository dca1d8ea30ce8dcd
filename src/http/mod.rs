//! HTTP surface of the service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, request tracing)
//!     → middleware/instrumentation.rs (request counters, latency)
//!     → middleware/log_capture.rs (buffer bodies, ship exchange log)
//!     → handler
//! ```

pub mod middleware;
pub mod server;

pub use server::HttpServer;
