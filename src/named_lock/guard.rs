use super::LockManager;

/// A scoped exclusive lock on a name, released when dropped.
#[derive(Debug)]
#[must_use = "if unused the lock is released immediately"]
pub struct NamedWriteGuard<'a> {
    locks: &'a LockManager,
    name: String,
}

impl<'a> NamedWriteGuard<'a> {
    pub(super) fn new(locks: &'a LockManager, name: &str) -> Self {
        locks.write_lock(name);
        Self {
            locks,
            name: name.to_string(),
        }
    }

    /// Returns the locked name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedWriteGuard<'_> {
    fn drop(&mut self) {
        self.locks.write_unlock(&self.name);
    }
}

/// A scoped shared lock on a name, released when dropped.
#[derive(Debug)]
#[must_use = "if unused the lock is released immediately"]
pub struct NamedReadGuard<'a> {
    locks: &'a LockManager,
    name: String,
}

impl<'a> NamedReadGuard<'a> {
    pub(super) fn new(locks: &'a LockManager, name: &str) -> Self {
        locks.read_lock(name);
        Self {
            locks,
            name: name.to_string(),
        }
    }

    /// Returns the locked name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedReadGuard<'_> {
    fn drop(&mut self) {
        self.locks.read_unlock(&self.name);
    }
}
