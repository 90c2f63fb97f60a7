//! Millisecond clocks.
//!
//! The engine only ever asks for "now" and compares it against deadlines it
//! computed earlier, so every implementation must be monotonic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Monotonic timestamp in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall-clock anchored monotonic clock: epoch milliseconds at construction,
/// advanced by `Instant` afterwards so it never goes backwards.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    epoch_ms: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| millis_i64(d.as_millis()))
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms
            .saturating_add(millis_i64(self.origin.elapsed().as_millis()))
    }
}

/// Hand-driven clock for tests and deterministic replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) -> i64 {
        self.now.fetch_add(ms.max(0), Ordering::SeqCst) + ms.max(0)
    }

    /// Moves the clock to `ms`; earlier values are ignored.
    pub fn set(&self, ms: i64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

fn millis_i64(ms: u128) -> i64 {
    if ms > i64::MAX as u128 {
        i64::MAX
    } else {
        ms as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.advance(250), 1_250);
        clock.set(900);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(2_000);
        assert_eq!(clock.now_ms(), 2_000);
    }

    #[test]
    fn monotonic_clock_is_epoch_based() {
        let clock = MonotonicClock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(first > 1_600_000_000_000);
        assert!(second >= first);
    }
}
