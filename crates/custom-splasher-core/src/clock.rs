//! Time sources for the timer registry.
//!
//! Everything that schedules work reads time through [`Clock`] so the same
//! code runs against the wall clock in production and a [`ManualClock`]
//! in tests and headless drivers.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Block until `deadline` has passed.
    fn sleep_until(&self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(self.now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

/// The wall clock, backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Time starts at the instant the clock was created and advances by explicit
/// calls to [`advance`](Self::advance) or [`set_elapsed`](Self::set_elapsed).
/// Share it behind an `Arc` between the registry and the code driving it.
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at its creation instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Jump to an absolute offset from the origin.
    ///
    /// Time never goes backwards: offsets earlier than the current one are ignored.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut current = self.elapsed.lock();
        if elapsed > *current {
            *current = elapsed;
        }
    }

    /// Time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// The instant the clock started at.
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    /// Jumps straight to `deadline` instead of blocking.
    fn sleep_until(&self, deadline: Instant) {
        self.set_elapsed(deadline.saturating_duration_since(self.origin));
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
