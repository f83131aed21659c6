//! Clock Module
//!
//! Time sources used to stamp cache entries. The manager never reads the wall
//! clock directly so tests can control "now".

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

// == Clock Trait ==
/// A source of "now" in Unix milliseconds.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

// == System Clock ==
/// Wall-clock time backed by chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

// == Manual Clock ==
/// A clock that only moves when told to.
///
/// Every read can optionally advance the clock by a fixed step, which makes
/// successive operations observe strictly increasing timestamps.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
    auto_advance: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_millis`.
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
            auto_advance: AtomicI64::new(0),
        }
    }

    /// Creates a clock that advances by `step` after every read.
    pub fn with_auto_advance(start_millis: i64, step: Duration) -> Self {
        let clock = Self::new(start_millis);
        clock.set_auto_advance(step);
        clock
    }

    /// Changes the step applied after every read.
    pub fn set_auto_advance(&self, step: Duration) {
        self.auto_advance
            .store(duration_millis(step), Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_millis(by), Ordering::SeqCst);
    }

    /// Jumps the clock to an absolute instant.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Returns the current instant without advancing.
    pub fn peek(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        let step = self.auto_advance.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst)
    }
}

/// Converts a duration to whole milliseconds, saturating at `i64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
