//! Monotonic time source for update timeouts.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic clock. `now` is measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Used by hosts that drive time
/// explicitly and by tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    pub fn set(&self, at: Duration) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
