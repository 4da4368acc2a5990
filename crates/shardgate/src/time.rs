//! Wall-clock source for the production servers.
//!
//! The business crates never read the clock themselves; the servers
//! stamp every call with this so tests can drive those crates with
//! synthetic time instead.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds.
pub fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_is_monotonic_enough() {
        let a = wall_clock_ms();
        let b = wall_clock_ms();
        assert!(b >= a);
        // Sanity: we are past 2020 and before 2100.
        assert!(a > 1_577_836_800_000);
        assert!(a < 4_102_444_800_000);
    }
}
