use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::{
    lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard},
    Mutex, RawRwLock, RwLock,
};

use super::{LockMode, ReapPolicy, UnlockError};

type WriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;
type ReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;

/// Guards parked in an entry between a lock call and its matching unlock call.
#[derive(Default)]
struct HeldGuards {
    writer: Option<WriteGuard>,
    readers: Vec<ReadGuard>,
}

/// A lazily created per-name lock.
pub(super) struct LockEntry {
    lock: Arc<RwLock<()>>,
    held: Mutex<HeldGuards>,
    generation: u64,
}

impl core::fmt::Debug for LockEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockEntry")
            .field("generation", &self.generation)
            .field("locked", &self.lock.is_locked())
            .finish_non_exhaustive()
    }
}

impl LockEntry {
    fn new(generation: u64) -> Self {
        Self {
            lock: Arc::new(RwLock::new(())),
            held: Mutex::new(HeldGuards::default()),
            generation,
        }
    }

    pub(super) fn generation(&self) -> u64 {
        self.generation
    }

    /// Blocks until exclusive access is acquired, then parks the guard in the entry.
    pub(super) fn acquire_write(&self) {
        let guard = self.lock.write_arc();
        self.held.lock().writer = Some(guard);
    }

    /// Blocks until shared access is acquired, then parks the guard in the entry.
    pub(super) fn acquire_read(&self) {
        let guard = self.lock.read_arc();
        self.held.lock().readers.push(guard);
    }

    /// Releases a parked guard of the given mode.
    ///
    /// The guard is dropped after the held slot is unlocked, so waking waiters never contends on it.
    pub(super) fn release(&self, mode: LockMode) -> bool {
        let mut held = self.held.lock();
        match mode {
            LockMode::Write => {
                let guard = held.writer.take();
                drop(held);
                guard.is_some()
            }
            LockMode::Read => {
                let guard = held.readers.pop();
                drop(held);
                guard.is_some()
            }
        }
    }

    /// Returns true if the lock is held, or an acquisition holds a reference to it.
    fn in_use(self: &Arc<Self>) -> bool {
        // The registry holds one reference to each entry and held guards hold one reference to the lock each.
        Arc::strong_count(self) > 1 || Arc::strong_count(&self.lock) > 1 || self.lock.is_locked()
    }
}

/// The outcome of [`Registry::evict`].
#[derive(Debug, Default)]
pub(super) struct Eviction<'a> {
    pub(super) evicted: Vec<&'a str>,
    pub(super) in_use: Vec<&'a str>,
}

/// The registry of named locks.
///
/// Lookup and creation of an entry for a name happen under a single critical section, so at most one entry exists per name.
#[derive(Debug, Default)]
pub(super) struct Registry {
    entries: Mutex<HashMap<String, Arc<LockEntry>>>,
    generation: AtomicU64,
}

impl Registry {
    /// Returns the entry for `name`, creating it if it does not exist.
    ///
    /// The registry guard is released before returning, so the caller never waits on an entry while holding it.
    pub(super) fn get_or_create(&self, name: &str) -> Arc<LockEntry> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(name) {
            return entry.clone();
        }
        let entry = Arc::new(LockEntry::new(
            self.generation.fetch_add(1, Ordering::Relaxed),
        ));
        entries.insert(name.to_string(), entry.clone());
        entry
    }

    /// Returns the entry for `name` if it exists.
    pub(super) fn get(&self, name: &str) -> Option<Arc<LockEntry>> {
        self.entries.lock().get(name).cloned()
    }

    /// Releases a held lock on `name`.
    pub(super) fn release(&self, name: &str, mode: LockMode) -> Result<(), UnlockError> {
        let entry = self
            .get(name)
            .ok_or_else(|| UnlockError::UnknownName(name.to_string()))?;
        if entry.release(mode) {
            Ok(())
        } else {
            Err(UnlockError::NotHeld {
                name: name.to_string(),
                mode,
            })
        }
    }

    /// Removes the entries for `names` that may be evicted under `policy`.
    ///
    /// Names whose entries were removed or did not exist can be forgotten by the usage tracker.
    /// Names whose entries were kept because they are in use are reported separately.
    pub(super) fn evict<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        policy: ReapPolicy,
        limit: usize,
    ) -> Eviction<'a> {
        let mut entries = self.entries.lock();
        let mut eviction = Eviction::default();
        for name in names {
            if limit != 0 && eviction.evicted.len() >= limit {
                break;
            }
            let in_use = entries
                .get(name)
                .is_some_and(|entry| policy == ReapPolicy::Unheld && entry.in_use());
            if in_use {
                eviction.in_use.push(name);
            } else {
                entries.remove(name);
                eviction.evicted.push(name);
            }
        }
        eviction
    }

    pub(super) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_single_entry_per_name() {
        let registry = Registry::default();
        let a = registry.get_or_create("a");
        let a2 = registry.get_or_create("a");
        let b = registry.get_or_create("b");
        assert!(Arc::ptr_eq(&a, &a2));
        assert_ne!(a.generation(), b.generation());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_release_unknown_and_unheld() {
        let registry = Registry::default();
        assert_eq!(
            registry.release("missing", LockMode::Write),
            Err(UnlockError::UnknownName("missing".to_string()))
        );
        registry.get_or_create("a").acquire_read();
        assert_eq!(
            registry.release("a", LockMode::Write),
            Err(UnlockError::NotHeld {
                name: "a".to_string(),
                mode: LockMode::Write
            })
        );
        assert_eq!(registry.release("a", LockMode::Read), Ok(()));
        assert!(registry.release("a", LockMode::Read).is_err());
    }

    #[test]
    fn registry_evict_respects_policy() {
        let registry = Registry::default();
        registry.get_or_create("held").acquire_write();
        drop(registry.get_or_create("idle"));

        let eviction = registry.evict(["held", "idle", "gone"], ReapPolicy::Unheld, 0);
        assert_eq!(eviction.evicted, ["idle", "gone"]);
        assert_eq!(eviction.in_use, ["held"]);
        assert!(registry.get("held").is_some());

        let eviction = registry.evict(["held"], ReapPolicy::ElapsedOnly, 0);
        assert_eq!(eviction.evicted, ["held"]);
        assert!(eviction.in_use.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_evict_referenced_entry() {
        let registry = Registry::default();
        let pending = registry.get_or_create("pending");
        let eviction = registry.evict(["pending"], ReapPolicy::Unheld, 0);
        assert!(eviction.evicted.is_empty());
        assert_eq!(eviction.in_use, ["pending"]);
        drop(pending);
        let eviction = registry.evict(["pending"], ReapPolicy::Unheld, 0);
        assert_eq!(eviction.evicted, ["pending"]);
    }

    #[test]
    fn registry_evict_limit() {
        let registry = Registry::default();
        for name in ["a", "b", "c"] {
            drop(registry.get_or_create(name));
        }
        assert_eq!(
            registry
                .evict(["a", "b", "c"], ReapPolicy::Unheld, 2)
                .evicted
                .len(),
            2
        );
        assert_eq!(registry.len(), 1);
    }
}
