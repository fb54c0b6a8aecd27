use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source used to timestamp named lock usage.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock.
///
/// Time only moves when [`advance`](ManualClock::advance) is called, which makes staleness deterministic in tests.
///
/// ```rust
/// # use std::{sync::Arc, time::Duration};
/// # use named_locks::named_lock::{LockManager, LockManagerOptions, ManualClock};
/// let clock = Arc::new(ManualClock::new());
/// let locks = LockManager::with_options(
///     LockManagerOptions::new(Duration::from_secs(60)).with_clock(clock.clone()),
/// );
/// locks.write_lock("x");
/// locks.write_unlock("x");
/// clock.advance(Duration::from_secs(61));
/// locks.read_lock("y");
/// assert!(!locks.is_tracked("x"));
/// # locks.read_unlock("y");
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a new manual clock starting at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Returns the total duration the clock has been advanced by.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advance() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_secs(5));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - start, Duration::from_millis(5500));
        assert_eq!(clock.elapsed(), Duration::from_millis(5500));
    }
}
