//! Named reader/writer locks.
//!
//! [`LockManager`] implements [`NamedLocksTraits`] to grant exclusive (write) or shared (read) access to a resource identified by an arbitrary string name.
//! Unrelated names can be locked concurrently, while access to the same name is serialised by a per-name [`parking_lot::RwLock`].
//!
//! Per-name locks are created lazily on first use and reclaimed by a reaper once they have not been touched for a [stale timeout](crate::config::Config#stale-timeout).
//! Reclamation is either performed inline by lock and unlock calls, on demand with [`LockManager::reap`], or in the background with [`LockManager::spawn_reaper`].
//!
//! The lock implementations include:
//!  - [`LockManager`] implements process local locking.
//!    - Lock and unlock calls are independent, so an acquisition can be released from a different call site (or thread) than the one that acquired it.
//!    - Scoped [`NamedWriteGuard`] and [`NamedReadGuard`] RAII guards are available with [`LockManager::write`] and [`LockManager::read`].
//!  - [`DisabledNamedLocks`] disables locking entirely.
//!    - **Requires that the caller guarantees exclusive access by other means**.

mod clock;
mod disabled;
mod guard;
mod lock_manager;
mod reaper;
mod registry;
mod usage_tracker;

use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use disabled::DisabledNamedLocks;
pub use guard::{NamedReadGuard, NamedWriteGuard};
pub use lock_manager::{LockManager, LockManagerOptions};
pub use reaper::{ReapPolicy, ReaperHandle};

/// Named lock manager.
pub type NamedLocks = Arc<dyn NamedLocksTraits>;

/// Traits for named lock managers.
///
/// None of the methods return an error.
/// Releasing a name that is not held is a no-op.
pub trait NamedLocksTraits: Send + Sync + core::fmt::Debug {
    /// Acquires exclusive access to `name`, blocking the current thread until no other lock on `name` is held.
    fn write_lock(&self, name: &str);

    /// Releases exclusive access to `name` previously acquired with [`write_lock`](NamedLocksTraits::write_lock).
    fn write_unlock(&self, name: &str);

    /// Acquires shared access to `name`, blocking the current thread while a writer holds `name`.
    fn read_lock(&self, name: &str);

    /// Releases shared access to `name` previously acquired with [`read_lock`](NamedLocksTraits::read_lock).
    fn read_unlock(&self, name: &str);
}

/// The access mode of a named lock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum LockMode {
    /// Shared access.
    #[display("read")]
    Read,
    /// Exclusive access.
    #[display("write")]
    Write,
}

/// An error releasing a named lock.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UnlockError {
    /// No lock exists for the name.
    #[error("no lock exists for {0}")]
    UnknownName(String),
    /// The lock exists but is not held in the requested mode.
    #[error("{name} is not {mode} locked")]
    NotHeld {
        /// The lock name.
        name: String,
        /// The mode that was released.
        mode: LockMode,
    },
}
