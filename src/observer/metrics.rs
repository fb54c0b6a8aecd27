//! A lock observer which records operation counts.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{LockObserver, LockOperation};

/// The metrics lock observer. Accumulates counts of completed lock operations and evictions.
///
/// It is intended to aid in testing by allowing the application to validate that lock usage matches expected values for specific operations.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    write_locks: AtomicUsize,
    write_unlocks: AtomicUsize,
    read_locks: AtomicUsize,
    read_unlocks: AtomicUsize,
    waiting: AtomicUsize,
    reaped: AtomicUsize,
}

impl MetricsObserver {
    /// Create a new metrics observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of completed write lock acquisitions.
    #[must_use]
    pub fn write_locks(&self) -> usize {
        self.write_locks.load(Ordering::Relaxed)
    }

    /// Returns the number of write unlock calls.
    #[must_use]
    pub fn write_unlocks(&self) -> usize {
        self.write_unlocks.load(Ordering::Relaxed)
    }

    /// Returns the number of completed read lock acquisitions.
    #[must_use]
    pub fn read_locks(&self) -> usize {
        self.read_locks.load(Ordering::Relaxed)
    }

    /// Returns the number of read unlock calls.
    #[must_use]
    pub fn read_unlocks(&self) -> usize {
        self.read_unlocks.load(Ordering::Relaxed)
    }

    /// Returns the number of lock calls that have started but not yet acquired their lock.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Returns the number of names evicted by the reaper.
    #[must_use]
    pub fn reaped(&self) -> usize {
        self.reaped.load(Ordering::Relaxed)
    }
}

impl LockObserver for MetricsObserver {
    fn enter(&self, operation: LockOperation, _name: &str) {
        if operation.is_lock() {
            self.waiting.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn exit(&self, operation: LockOperation, _name: &str) {
        let counter = match operation {
            LockOperation::WriteLock => &self.write_locks,
            LockOperation::WriteUnlock => &self.write_unlocks,
            LockOperation::ReadLock => &self.read_locks,
            LockOperation::ReadUnlock => &self.read_unlocks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if operation.is_lock() {
            self.waiting.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn reaped(&self, _name: &str) {
        self.reaped.fetch_add(1, Ordering::Relaxed);
    }
}
