//! Time source abstraction
//!
//! The scanner never reads wall time directly. Pulse widths, edge deadlines and
//! settling pauses all go through a [`Clock`], which lets the simulated board
//! run a whole sweep in virtual time.

use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock with blocking sleep
pub trait Clock: Send + Sync {
    /// Elapsed time since the clock's origin
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
