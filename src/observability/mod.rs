//! Process-local observability.
//!
//! # Data Flow
//! ```text
//! All subsystems emit `tracing` events
//!     → logging.rs (EnvFilter → pretty or JSON fmt layer → stdout)
//! ```

pub mod logging;

pub use logging::init_tracing;
