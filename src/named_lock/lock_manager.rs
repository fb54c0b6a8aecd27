use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::warn;

use crate::{
    config::global_config,
    observer::{LockObserverRef, LockOperation},
};

use super::{
    clock::{Clock, SystemClock},
    guard::{NamedReadGuard, NamedWriteGuard},
    reaper::{ReapPolicy, Reaper, ReaperHandle},
    registry::Registry,
    usage_tracker::UsageTracker,
    NamedLocksTraits, UnlockError,
};

/// Options for constructing a [`LockManager`].
///
/// Options that are not set explicitly default to the [global configuration](crate::config::Config).
#[derive(Debug, Clone)]
pub struct LockManagerOptions {
    stale_timeout: Duration,
    reap_policy: ReapPolicy,
    reap_limit: usize,
    inline_reaping: bool,
    clock: Arc<dyn Clock>,
    observer: Option<LockObserverRef>,
}

impl Default for LockManagerOptions {
    fn default() -> Self {
        let stale_timeout = global_config().stale_timeout();
        Self::new(stale_timeout)
    }
}

impl LockManagerOptions {
    /// Create new lock manager options with a [stale timeout](crate::config::Config#stale-timeout).
    #[must_use]
    pub fn new(stale_timeout: Duration) -> Self {
        let config = global_config();
        Self {
            stale_timeout,
            reap_policy: config.reap_policy(),
            reap_limit: config.reap_limit(),
            inline_reaping: config.inline_reaping(),
            clock: Arc::new(SystemClock),
            observer: None,
        }
    }

    /// Set the [reap policy](crate::config::Config#reap-policy).
    #[must_use]
    pub fn with_reap_policy(mut self, reap_policy: ReapPolicy) -> Self {
        self.reap_policy = reap_policy;
        self
    }

    /// Set the [reap limit](crate::config::Config#reap-limit).
    #[must_use]
    pub fn with_reap_limit(mut self, reap_limit: usize) -> Self {
        self.reap_limit = reap_limit;
        self
    }

    /// Set [inline reaping](crate::config::Config#inline-reaping).
    #[must_use]
    pub fn with_inline_reaping(mut self, inline_reaping: bool) -> Self {
        self.inline_reaping = inline_reaping;
        self
    }

    /// Set the clock used to timestamp usage.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the observer notified of every operation.
    #[must_use]
    pub fn with_observer(mut self, observer: LockObserverRef) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// A named lock manager.
///
/// Grants exclusive or shared access to resources identified by name.
/// A [`parking_lot::RwLock`] is created for a name the first time it is locked, and removed by the reaper once the name has not been locked or unlocked for the stale timeout.
///
/// The registry of locks, the usage tracker and the reaper each have their own guard.
/// A caller never holds the registry guard while waiting for a named lock, so contention on one name does not delay any other name.
///
/// Lock and unlock calls are not tied to a scope or a thread.
/// Every call must be paired with the matching unlock call, or use the scoped [`write`](LockManager::write) and [`read`](LockManager::read) guards instead.
///
/// ### Example
/// ```rust
/// # use std::time::Duration;
/// # use named_locks::named_lock::LockManager;
/// let locks = LockManager::new(Duration::from_secs(600));
/// locks.write_lock("volume/a");
/// locks.read_lock("volume/b"); // unrelated names do not block
/// locks.read_unlock("volume/b");
/// locks.write_unlock("volume/a");
/// locks.write_unlock("volume/c"); // unknown names are ignored
/// ```
#[derive(Debug)]
pub struct LockManager {
    registry: Registry,
    usage: Mutex<UsageTracker>,
    reaper: Reaper,
    stale_timeout: Duration,
    inline_reaping: bool,
    clock: Arc<dyn Clock>,
    observer: Option<LockObserverRef>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::with_options(LockManagerOptions::default())
    }
}

impl LockManager {
    /// Create a new lock manager with a [stale timeout](crate::config::Config#stale-timeout).
    #[must_use]
    pub fn new(stale_timeout: Duration) -> Self {
        Self::with_options(LockManagerOptions::new(stale_timeout))
    }

    /// Create a new lock manager with `options`.
    #[must_use]
    pub fn with_options(options: LockManagerOptions) -> Self {
        Self {
            registry: Registry::default(),
            usage: Mutex::new(UsageTracker::default()),
            reaper: Reaper::new(options.reap_policy, options.reap_limit),
            stale_timeout: options.stale_timeout,
            inline_reaping: options.inline_reaping,
            clock: options.clock,
            observer: options.observer,
        }
    }

    /// Returns the stale timeout.
    #[must_use]
    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout
    }

    /// Returns the reap policy.
    #[must_use]
    pub fn reap_policy(&self) -> ReapPolicy {
        self.reaper.policy()
    }

    /// Acquires exclusive access to `name`, blocking the current thread until no other lock on `name` is held.
    pub fn write_lock(&self, name: &str) {
        self.observe(LockOperation::WriteLock, name, || {
            self.registry.get_or_create(name).acquire_write();
        });
    }

    /// Acquires shared access to `name`, blocking the current thread while a writer holds `name`.
    pub fn read_lock(&self, name: &str) {
        self.observe(LockOperation::ReadLock, name, || {
            self.registry.get_or_create(name).acquire_read();
        });
    }

    /// Releases exclusive access to `name`.
    ///
    /// This is a no-op if `name` has no lock.
    /// Releasing a lock that is not write locked is also a no-op, and is logged as a warning.
    pub fn write_unlock(&self, name: &str) {
        Self::absorb(self.try_write_unlock(name));
    }

    /// Releases shared access to `name`.
    ///
    /// This is a no-op if `name` has no lock.
    /// Releasing a lock that is not read locked is also a no-op, and is logged as a warning.
    pub fn read_unlock(&self, name: &str) {
        Self::absorb(self.try_read_unlock(name));
    }

    /// Releases exclusive access to `name`.
    ///
    /// # Errors
    /// Returns an [`UnlockError`] if `name` has no lock or is not write locked.
    pub fn try_write_unlock(&self, name: &str) -> Result<(), UnlockError> {
        self.observe(LockOperation::WriteUnlock, name, || {
            self.registry.release(name, LockOperation::WriteUnlock.mode())
        })
    }

    /// Releases shared access to `name`.
    ///
    /// # Errors
    /// Returns an [`UnlockError`] if `name` has no lock or is not read locked.
    pub fn try_read_unlock(&self, name: &str) -> Result<(), UnlockError> {
        self.observe(LockOperation::ReadUnlock, name, || {
            self.registry.release(name, LockOperation::ReadUnlock.mode())
        })
    }

    /// Acquires exclusive access to `name`, returning a guard that releases it when dropped.
    #[must_use]
    pub fn write(&self, name: &str) -> NamedWriteGuard<'_> {
        NamedWriteGuard::new(self, name)
    }

    /// Acquires shared access to `name`, returning a guard that releases it when dropped.
    #[must_use]
    pub fn read(&self, name: &str) -> NamedReadGuard<'_> {
        NamedReadGuard::new(self, name)
    }

    /// Evicts stale names, waiting for any concurrent reaper pass to finish first.
    ///
    /// Returns the number of names evicted.
    pub fn reap(&self) -> usize {
        let reaped = self.reaper.reap(
            &self.registry,
            &self.usage,
            self.clock.now(),
            self.stale_timeout,
        );
        self.notify_reaped(&reaped);
        reaped.len()
    }

    /// Spawns a thread that calls [`reap`](LockManager::reap) every `interval`.
    ///
    /// The thread exits when the returned handle is stopped or dropped, or when the lock manager is dropped.
    #[must_use]
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> ReaperHandle {
        ReaperHandle::spawn(Arc::downgrade(self), interval)
    }

    /// Returns true if the usage of `name` is tracked.
    #[must_use]
    pub fn is_tracked(&self, name: &str) -> bool {
        self.usage.lock().contains(name)
    }

    /// Returns the number of names with tracked usage.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.usage.lock().len()
    }

    /// Returns the number of names with a lock.
    #[must_use]
    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Returns the generation of the lock for `name`, if it exists.
    ///
    /// Generations increase monotonically, so a changed generation means the lock for `name` was evicted and created again.
    #[must_use]
    pub fn generation(&self, name: &str) -> Option<u64> {
        self.registry.get(name).map(|entry| entry.generation())
    }

    /// Runs `operation` on `name` between observer notifications, then records usage.
    fn observe<T>(&self, operation: LockOperation, name: &str, f: impl FnOnce() -> T) -> T {
        if let Some(observer) = &self.observer {
            observer.enter(operation, name);
        }
        let result = f();
        self.touch(name);
        if let Some(observer) = &self.observer {
            observer.exit(operation, name);
        }
        result
    }

    fn touch(&self, name: &str) {
        let now = self.clock.now();
        self.usage.lock().touch(name, now);
        if self.inline_reaping {
            let reaped = self
                .reaper
                .try_reap(&self.registry, &self.usage, now, self.stale_timeout);
            self.notify_reaped(&reaped);
        }
    }

    fn notify_reaped(&self, reaped: &[String]) {
        if let Some(observer) = &self.observer {
            for name in reaped {
                observer.reaped(name);
            }
        }
    }

    fn absorb(result: Result<(), UnlockError>) {
        match result {
            Ok(()) | Err(UnlockError::UnknownName(_)) => {}
            Err(err @ UnlockError::NotHeld { .. }) => {
                warn!("Ignoring unlock: {err}");
            }
        }
    }
}

impl NamedLocksTraits for LockManager {
    fn write_lock(&self, name: &str) {
        LockManager::write_lock(self, name);
    }

    fn write_unlock(&self, name: &str) {
        LockManager::write_unlock(self, name);
    }

    fn read_lock(&self, name: &str) {
        LockManager::read_lock(self, name);
    }

    fn read_unlock(&self, name: &str) {
        LockManager::read_unlock(self, name);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    use crate::{named_lock::ManualClock, observer::MetricsObserver};

    use super::*;

    fn manual_locks(clock: &Arc<ManualClock>, policy: ReapPolicy) -> LockManager {
        LockManager::with_options(
            LockManagerOptions::new(Duration::from_secs(600))
                .with_clock(clock.clone())
                .with_reap_policy(policy)
                .with_reap_limit(0)
                .with_inline_reaping(true),
        )
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn lock_manager_write_lock_sync() {
        let locks = LockManager::new(Duration::from_secs(600));
        let locks_held = AtomicUsize::new(0);
        assert!(!(0..20).into_par_iter().any(|_| {
            locks.write_lock("key");
            locks_held.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            let locks_held = locks_held.fetch_sub(1, Ordering::SeqCst);
            locks.write_unlock("key");
            locks_held > 1
        }));
        assert_eq!(locks.registry_len(), 1);
    }

    #[test]
    fn lock_manager_unknown_unlock() {
        let locks = LockManager::new(Duration::from_secs(600));
        locks.write_lock("held");
        locks.write_unlock("never-locked");
        locks.read_unlock("never-locked");
        assert_eq!(
            locks.try_read_unlock("never-locked"),
            Err(UnlockError::UnknownName("never-locked".to_string()))
        );
        assert_eq!(locks.registry_len(), 1);
        assert!(locks.is_tracked("never-locked"));
        assert_eq!(locks.try_write_unlock("held"), Ok(()));
    }

    #[test]
    fn lock_manager_mismatched_unlock() {
        let locks = LockManager::new(Duration::from_secs(600));
        locks.read_lock("a");
        locks.write_unlock("a");
        assert!(matches!(
            locks.try_write_unlock("a"),
            Err(UnlockError::NotHeld { .. })
        ));
        assert_eq!(locks.try_read_unlock("a"), Ok(()));
        assert!(locks.try_read_unlock("a").is_err());
    }

    #[test]
    fn lock_manager_reclaims_stale() {
        let clock = Arc::new(ManualClock::new());
        let locks = manual_locks(&clock, ReapPolicy::Unheld);
        locks.write_lock("x");
        locks.write_unlock("x");
        assert!(locks.is_tracked("x"));

        clock.advance(Duration::from_secs(600));
        locks.read_lock("y");
        assert!(locks.is_tracked("x"), "exactly the timeout is not stale");

        clock.advance(Duration::from_secs(1));
        locks.read_unlock("y");
        assert!(!locks.is_tracked("x"));
        assert!(locks.generation("x").is_none());
        assert_eq!(locks.tracked_len(), 1);
        assert_eq!(locks.registry_len(), 1);
    }

    #[test]
    fn lock_manager_unheld_policy_keeps_held() {
        let clock = Arc::new(ManualClock::new());
        let locks = manual_locks(&clock, ReapPolicy::Unheld);
        locks.read_lock("held");
        let generation = locks.generation("held");
        clock.advance(Duration::from_secs(601));
        locks.write_lock("other");
        assert_eq!(locks.generation("held"), generation);
        assert!(locks.is_tracked("held"));

        locks.read_unlock("held");
        clock.advance(Duration::from_secs(601));
        locks.write_unlock("other");
        assert!(locks.generation("held").is_none());
        assert!(locks.generation("other").is_some());
    }

    #[test]
    fn lock_manager_defers_held_stale() {
        let clock = Arc::new(ManualClock::new());
        let locks = manual_locks(&clock, ReapPolicy::Unheld);
        let timeout = locks.stale_timeout();
        locks.write_lock("held");
        let generation = locks.generation("held");
        clock.advance(timeout + Duration::from_secs(1));

        // The first pass finds "held" in use and moves its record forward.
        locks.read_lock("other");
        assert!(!locks.usage.lock().has_stale(clock.now(), timeout));
        for i in 0..100 {
            let name = format!("other/{i}");
            locks.write_lock(&name);
            locks.write_unlock(&name);
            assert!(!locks.usage.lock().has_stale(clock.now(), timeout));
        }
        assert_eq!(locks.reap(), 0);
        assert_eq!(locks.generation("held"), generation);

        // Still held after another timeout, so it is deferred again while the idle names are evicted.
        clock.advance(timeout + Duration::from_secs(1));
        locks.read_unlock("other");
        assert!(!locks.usage.lock().has_stale(clock.now(), timeout));
        assert_eq!(locks.generation("held"), generation);
        assert_eq!(locks.tracked_len(), 2);

        locks.write_unlock("held");
        clock.advance(timeout + Duration::from_secs(1));
        assert_eq!(locks.reap(), 2);
        assert_eq!(locks.registry_len(), 0);
        assert_eq!(locks.tracked_len(), 0);
    }

    #[test]
    fn lock_manager_reap_limit() {
        let clock = Arc::new(ManualClock::new());
        let locks = LockManager::with_options(
            LockManagerOptions::new(Duration::from_secs(10))
                .with_clock(clock.clone())
                .with_reap_limit(2)
                .with_inline_reaping(false),
        );
        for name in ["a", "b", "c", "d", "e"] {
            locks.write_lock(name);
            locks.write_unlock(name);
        }
        clock.advance(Duration::from_secs(11));
        assert_eq!(locks.tracked_len(), 5);
        assert_eq!(locks.reap(), 2);
        assert_eq!(locks.reap(), 2);
        assert_eq!(locks.reap(), 1);
        assert_eq!(locks.reap(), 0);
        assert_eq!(locks.registry_len(), 0);
        assert_eq!(locks.tracked_len(), 0);
    }

    #[test]
    fn lock_manager_observer() {
        let clock = Arc::new(ManualClock::new());
        let metrics = Arc::new(MetricsObserver::new());
        let locks = LockManager::with_options(
            LockManagerOptions::new(Duration::from_secs(10))
                .with_clock(clock.clone())
                .with_reap_limit(0)
                .with_observer(metrics.clone()),
        );
        locks.write_lock("a");
        locks.write_unlock("a");
        locks.read_lock("b");
        locks.read_lock("b");
        locks.read_unlock("b");
        locks.read_unlock("b");
        clock.advance(Duration::from_secs(11));
        assert_eq!(locks.reap(), 2);
        assert_eq!(metrics.write_locks(), 1);
        assert_eq!(metrics.write_unlocks(), 1);
        assert_eq!(metrics.read_locks(), 2);
        assert_eq!(metrics.read_unlocks(), 2);
        assert_eq!(metrics.waiting(), 0);
        assert_eq!(metrics.reaped(), 2);
    }

    #[test]
    fn lock_manager_scoped_guards() {
        let locks = LockManager::new(Duration::from_secs(600));
        {
            let guard = locks.write("a");
            assert_eq!(guard.name(), "a");
            assert!(matches!(
                locks.try_read_unlock("a"),
                Err(UnlockError::NotHeld { .. })
            ));
        }
        let first = locks.read("a");
        let second = locks.read("a");
        drop(first);
        assert_eq!(locks.try_read_unlock("a"), Ok(()));
        // Both read locks are released, so dropping the second guard is a no-op.
        drop(second);
        assert!(locks.try_read_unlock("a").is_err());
    }
}
