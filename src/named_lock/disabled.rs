//! Disabled named locks.

use super::NamedLocksTraits;

/// Disabled named locks.
///
/// Every lock call returns immediately without acquiring anything.
#[derive(Debug, Default)]
pub struct DisabledNamedLocks;

impl NamedLocksTraits for DisabledNamedLocks {
    fn write_lock(&self, _name: &str) {}

    fn write_unlock(&self, _name: &str) {}

    fn read_lock(&self, _name: &str) {}

    fn read_unlock(&self, _name: &str) {}
}
