//! Server time source.
//!
//! The handler stamps `control-input` and `pong` events with the server time.
//! Reading the time through a trait lets unit tests pin it to a known value
//! with a mock instead of asserting on "roughly now".

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the server timestamp, in milliseconds since the Unix epoch.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // A clock set before 1970 yields 0 rather than an error.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z in milliseconds.
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_system_clock_does_not_go_backwards_between_calls() {
        let clock = SystemClock;
        let a = clock.now_millis();
        let b = clock.now_millis();
        assert!(b >= a);
    }
}
