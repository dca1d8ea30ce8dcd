//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<_>> to exporter and log shipper
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the shared config
//!     → next export tick / log push observes new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use schema::{
    LogFormat, LoggingConfig, MetricsConfig, ObservabilityConfig, ServerConfig, ServiceConfig,
};

/// Live configuration handle read by long-running telemetry tasks.
pub type SharedConfig = Arc<ArcSwap<ServiceConfig>>;

/// Wrap a configuration for sharing.
pub fn shared(config: ServiceConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
