//! Named locks global configuration options.

use std::{
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::named_lock::ReapPolicy;

/// Global configuration options for the named locks crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// These are defaults only.
/// A [`LockManager`](crate::named_lock::LockManager) reads them once at construction, and any option can be overridden per manager with [`LockManagerOptions`](crate::named_lock::LockManagerOptions).
///
/// # Reclamation Configuration Options
///
/// ## Stale Timeout
/// > default: `600` seconds
///
/// A named lock entry that has not been locked or unlocked for longer than this duration becomes eligible for removal by the reaper.
///
/// ## Reap Policy
/// > default: [`ReapPolicy::Unheld`]
///
/// Controls whether the reaper may evict a stale entry whose lock is still held or awaited.
/// See [`ReapPolicy`] for the guarantees of each policy.
///
/// ## Reap Limit
/// > default: `0`
///
/// The maximum number of entries evicted by a single reaper pass.
/// Bounding the number of evictions amortises reclamation over many calls.
/// The reap limit is disabled if set to zero.
///
/// ## Inline Reaping
/// > default: [`true`]
///
/// If enabled, every lock and unlock call attempts a reaper pass on the calling thread after updating usage.
/// Disable it when reclamation is driven by [`LockManager::spawn_reaper`](crate::named_lock::LockManager::spawn_reaper) or explicit [`LockManager::reap`](crate::named_lock::LockManager::reap) calls.
#[derive(Debug)]
pub struct Config {
    stale_timeout: Duration,
    reap_policy: ReapPolicy,
    reap_limit: usize,
    inline_reaping: bool,
}

/// The default [stale timeout](Config#stale-timeout).
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(600);

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            reap_policy: ReapPolicy::Unheld,
            reap_limit: 0,
            inline_reaping: true,
        }
    }
}

impl Config {
    /// Get the [stale timeout](#stale-timeout) configuration.
    #[must_use]
    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout
    }

    /// Set the [stale timeout](#stale-timeout) configuration.
    pub fn set_stale_timeout(&mut self, stale_timeout: Duration) {
        self.stale_timeout = stale_timeout;
    }

    /// Get the [reap policy](#reap-policy) configuration.
    #[must_use]
    pub fn reap_policy(&self) -> ReapPolicy {
        self.reap_policy
    }

    /// Set the [reap policy](#reap-policy) configuration.
    pub fn set_reap_policy(&mut self, reap_policy: ReapPolicy) {
        self.reap_policy = reap_policy;
    }

    /// Get the [reap limit](#reap-limit) configuration.
    #[must_use]
    pub fn reap_limit(&self) -> usize {
        self.reap_limit
    }

    /// Set the [reap limit](#reap-limit) configuration.
    pub fn set_reap_limit(&mut self, reap_limit: usize) {
        self.reap_limit = reap_limit;
    }

    /// Get the [inline reaping](#inline-reaping) configuration.
    #[must_use]
    pub fn inline_reaping(&self) -> bool {
        self.inline_reaping
    }

    /// Set the [inline reaping](#inline-reaping) configuration.
    pub fn set_inline_reaping(&mut self, inline_reaping: bool) {
        self.inline_reaping = inline_reaping;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global named locks configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global named locks configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
