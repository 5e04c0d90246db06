// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling.
//!
//! The timeout scheduler and rehydration-elapsed-time computation (spec.md
//! §4.4) are the reason this exists: tests need to advance time without
//! sleeping, and the runtime needs epoch milliseconds to compute `Δ` between
//! a persisted `last_state_change` and "now".

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time, both as a monotonic [`Instant`]
/// (for scheduling) and as epoch milliseconds (for persisted timestamps).
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Fake clock for testing with controllable time.
///
/// Kept behind `test-support` rather than `#[cfg(test)]` because downstream
/// crates (`fsm-engine`, the root `fsm-specs` integration tests) need it to
/// pin down the rehydration-timeout invariant (spec.md §8 property 5)
/// without a real sleep.
#[cfg(feature = "test-support")]
#[derive(Clone)]
pub struct FakeClock {
    current: std::sync::Arc<parking_lot::Mutex<Instant>>,
    epoch_ms: std::sync::Arc<parking_lot::Mutex<u64>>,
}

#[cfg(feature = "test-support")]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: std::sync::Arc::new(parking_lot::Mutex::new(Instant::now())),
            epoch_ms: std::sync::Arc::new(parking_lot::Mutex::new(1_000_000)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.epoch_ms.lock() += duration.as_millis() as u64;
    }

    /// Set the epoch milliseconds value directly (useful for seeding a
    /// persisted `last_state_change` in the past, then advancing to "now").
    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

#[cfg(feature = "test-support")]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "test-support")]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;