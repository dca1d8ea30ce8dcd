//! Remote structured log shipping.
//!
//! # Data Flow
//! ```text
//! log capture interceptor / business code
//!     → shipper.rs (serialize → redact.rs → event.rs)
//!     → spawned task → HTTP POST to logging.url
//! ```

pub mod event;
pub mod redact;
pub mod shipper;

pub use event::{HttpExchange, LogBatch, LogEvent, LogLevel};
pub use redact::redact;
pub use shipper::{LogShipper, ShipError};
