//! Telemetry core for the JWT Pizza service: request metrics, periodic
//! metric export and sanitized remote log shipping.

pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logs;
pub mod metrics;
pub mod observability;
pub mod telemetry;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use telemetry::Telemetry;
