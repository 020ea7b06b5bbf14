//! Wall-clock abstraction for bucket refill computation.
//!
//! Refill is a pure function of elapsed wall-clock time, so the limiter
//! reads time through a trait. Tests inject [`ManualClock`] to drive the
//! bucket protocol deterministically.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time as fractional seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn epoch_seconds(&self) -> f64;
}

/// Clock backed by the actual system time.
#[derive(Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn epoch_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before UNIX epoch")
            .as_secs_f64()
    }
}

/// Manually advanced clock for testing.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<RwLock<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Advance the clock by `seconds`.
    pub fn advance(&self, seconds: f64) {
        let mut now = self.now.write();
        *now += seconds;
    }

    pub fn set(&self, epoch_seconds: f64) {
        let mut now = self.now.write();
        *now = epoch_seconds;
    }
}

impl Clock for ManualClock {
    fn epoch_seconds(&self) -> f64 {
        *self.now.read()
    }
}
