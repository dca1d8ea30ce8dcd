//! Wall-clock timestamps for wire formats.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, read now.
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
