use std::{
    collections::HashSet,
    sync::{Arc, Weak},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use itertools::Itertools;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use super::{registry::Registry, usage_tracker::UsageTracker, LockManager};

/// The eviction policy of the named lock reaper.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReapPolicy {
    /// Evict a stale entry only if its lock is not held and no caller is waiting on it.
    ///
    /// Entries are referenced under the registry guard before they are waited on, so eviction never splits one name into two independent locks.
    /// A stale entry that is still in use has its usage record moved to the time of the pass, so it is not scanned again until it is stale once more.
    #[default]
    Unheld,
    /// Evict a stale entry purely by elapsed time, even if its lock is held.
    ///
    /// **This is a weak guarantee**.
    /// If a lock is held for longer than the stale timeout, its entry can be evicted while held.
    /// A later caller for the same name then creates a new, independent lock and proceeds without waiting for the original holder.
    ///
    /// Callers already waiting on an evicted entry can block forever.
    /// The holder's unlock finds no entry for the name, or the new one, so the guard on the evicted lock is never released.
    ElapsedOnly,
}

/// Scans usage records and evicts stale named locks.
///
/// Passes are serialised by the reap guard, which is distinct from the registry and usage guards.
#[derive(Debug)]
pub(super) struct Reaper {
    guard: Mutex<()>,
    policy: ReapPolicy,
    limit: usize,
}

impl Reaper {
    pub(super) fn new(policy: ReapPolicy, limit: usize) -> Self {
        Self {
            guard: Mutex::new(()),
            policy,
            limit,
        }
    }

    pub(super) fn policy(&self) -> ReapPolicy {
        self.policy
    }

    /// Runs a reaper pass, waiting for any concurrent pass to finish first.
    pub(super) fn reap(
        &self,
        registry: &Registry,
        usage: &Mutex<UsageTracker>,
        now: Instant,
        stale_timeout: Duration,
    ) -> Vec<String> {
        let guard = self.guard.lock();
        self.reap_locked(&guard, registry, usage, now, stale_timeout)
    }

    /// Runs a reaper pass unless another pass is in progress.
    pub(super) fn try_reap(
        &self,
        registry: &Registry,
        usage: &Mutex<UsageTracker>,
        now: Instant,
        stale_timeout: Duration,
    ) -> Vec<String> {
        match self.guard.try_lock() {
            Some(guard) => self.reap_locked(&guard, registry, usage, now, stale_timeout),
            None => Vec::new(),
        }
    }

    fn reap_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
        registry: &Registry,
        usage: &Mutex<UsageTracker>,
        now: Instant,
        stale_timeout: Duration,
    ) -> Vec<String> {
        let stale = {
            let usage = usage.lock();
            if !usage.has_stale(now, stale_timeout) {
                return Vec::new();
            }
            usage.stale(now, stale_timeout)
        };

        let eviction = registry.evict(
            stale.iter().map(|(name, _)| name.as_str()),
            self.policy,
            self.limit,
        );
        if eviction.evicted.is_empty() && eviction.in_use.is_empty() {
            return Vec::new();
        }
        let evicted: HashSet<&str> = eviction.evicted.into_iter().collect();
        let in_use: HashSet<&str> = eviction.in_use.into_iter().collect();

        let mut usage = usage.lock();
        let mut reaped = Vec::with_capacity(evicted.len());
        for (name, touched) in &stale {
            if evicted.contains(name.as_str()) {
                if usage.forget(name, *touched) {
                    reaped.push(name.clone());
                }
            } else if in_use.contains(name.as_str()) {
                usage.defer(name, *touched, now);
            }
        }
        drop(usage);

        if !in_use.is_empty() {
            debug!(
                "Deferred {} stale named lock(s) still in use: {}",
                in_use.len(),
                in_use.iter().sorted().format(", ")
            );
        }
        if reaped.is_empty() {
            return reaped;
        }
        debug!(
            "Removed {} stale named lock(s) exceeding the {:?} timeout: {}",
            reaped.len(),
            stale_timeout,
            reaped.iter().format(", ")
        );
        reaped
    }
}

struct ReaperSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

/// A handle to a background reaper thread started by [`LockManager::spawn_reaper`].
///
/// The thread is stopped and joined when the handle is dropped.
pub struct ReaperHandle {
    signal: Arc<ReaperSignal>,
    thread: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for ReaperHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "reaper handle")
    }
}

impl ReaperHandle {
    pub(super) fn spawn(manager: Weak<LockManager>, interval: Duration) -> Self {
        let signal = Arc::new(ReaperSignal {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        });
        let thread = std::thread::spawn({
            let signal = signal.clone();
            move || loop {
                {
                    let mut stopped = signal.stopped.lock();
                    if !*stopped {
                        signal.condvar.wait_for(&mut stopped, interval);
                    }
                    if *stopped {
                        break;
                    }
                }
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.reap();
            }
        });
        Self {
            signal,
            thread: Some(thread),
        }
    }

    /// Returns true if the reaper thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the reaper thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.condvar.notify_all();
        if let Some(thread) = self.thread.take() {
            // A panicking reap pass has already been reported by the panic hook.
            let _ = thread.join();
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
