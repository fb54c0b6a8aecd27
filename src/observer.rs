//! Observers of named lock operations.
//!
//! A [`LockObserver`] is notified at the entry and exit of each [`LockManager`](crate::named_lock::LockManager) operation and whenever the reaper evicts a name.
//! Observers are purely informational and every method defaults to a no-op.
//!
//! The observer implementations include:
//!  - [`TracingObserver`]: emits `trace` level [`tracing`] events.
//!  - [`UsageLogObserver`]: writes one line per call to a shared [`Write`](std::io::Write) handle.
//!  - [`MetricsObserver`]: accumulates operation counts.

mod metrics;
mod trace_log;
mod usage_log;

use std::sync::Arc;

use derive_more::Display;

pub use metrics::MetricsObserver;
pub use trace_log::TracingObserver;
pub use usage_log::UsageLogObserver;

use crate::named_lock::LockMode;

/// A named lock operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum LockOperation {
    /// Acquire exclusive access.
    #[display("write_lock")]
    WriteLock,
    /// Release exclusive access.
    #[display("write_unlock")]
    WriteUnlock,
    /// Acquire shared access.
    #[display("read_lock")]
    ReadLock,
    /// Release shared access.
    #[display("read_unlock")]
    ReadUnlock,
}

impl LockOperation {
    /// Returns the access mode of the operation.
    #[must_use]
    pub const fn mode(self) -> LockMode {
        match self {
            Self::WriteLock | Self::WriteUnlock => LockMode::Write,
            Self::ReadLock | Self::ReadUnlock => LockMode::Read,
        }
    }

    /// Returns true if the operation acquires a lock.
    #[must_use]
    pub const fn is_lock(self) -> bool {
        matches!(self, Self::WriteLock | Self::ReadLock)
    }
}

/// A shared lock observer.
pub type LockObserverRef = Arc<dyn LockObserver>;

/// Traits for observers of named lock operations.
pub trait LockObserver: Send + Sync + core::fmt::Debug {
    /// Called before `operation` on `name` begins.
    fn enter(&self, _operation: LockOperation, _name: &str) {}

    /// Called after `operation` on `name` completes.
    ///
    /// For lock operations this is after the lock has been acquired.
    fn exit(&self, _operation: LockOperation, _name: &str) {}

    /// Called after the reaper evicts `name`.
    fn reaped(&self, _name: &str) {}
}
