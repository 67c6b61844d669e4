//! Time sources for the event loop.
//!
//! The event loop never calls `Instant::now()` directly. It asks a [`Clock`],
//! which is either the real [`SystemClock`] or a [`ManualClock`] whose time
//! only moves when the loop waits for a deadline. The manual clock makes
//! timer-driven behavior (sweeps, deferred reconciles) deterministic.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A source of monotonic time that the event loop can wait on.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Block (or pretend to block) until `deadline` has been reached.
    ///
    /// Returns immediately if the deadline is already in the past.
    fn sleep_until(&self, deadline: Instant);
}

/// Wall-clock time. `sleep_until` parks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Virtual time that advances only when asked to.
///
/// Waiting on a deadline jumps straight to it, so a simulated minute of
/// timer activity runs in microseconds.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a manual clock starting at the current real instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn sleep_until(&self, deadline: Instant) {
        let mut now = self.now.lock();
        if deadline > *now {
            *now = deadline;
        }
    }
}
