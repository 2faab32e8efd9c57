//! Compact monotonic time utilities.
//!
//! Expiry deadlines are stored as `u64` milliseconds on a process-local
//! monotonic clock rather than `Option<Instant>`, which keeps entries
//! small and makes the expired check a single comparison.

use std::sync::OnceLock;
use std::time::Instant;

/// Returns current monotonic time in milliseconds since process start.
#[inline]
pub fn now_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

/// Sentinel value meaning "no expiry".
pub const NO_EXPIRY: u64 = 0;

/// Returns true if the given expiry deadline has passed.
#[inline]
pub fn is_expired(expires_at_ms: u64) -> bool {
    expires_at_ms != NO_EXPIRY && now_ms() >= expires_at_ms
}

/// Converts a TTL in whole seconds to an absolute expiry deadline.
#[inline]
pub fn deadline_in_secs(secs: u64) -> u64 {
    now_ms().saturating_add(secs.saturating_mul(1000))
}

/// Returns remaining whole seconds until the deadline (floored, never
/// negative), or `None` if the deadline is the no-expiry sentinel.
#[inline]
pub fn remaining_secs(expires_at_ms: u64) -> Option<u64> {
    if expires_at_ms == NO_EXPIRY {
        None
    } else {
        Some(expires_at_ms.saturating_sub(now_ms()) / 1000)
    }
}
