use std::{
    collections::{BTreeSet, HashMap},
    time::{Duration, Instant},
};

/// Last-touched timestamps of named locks.
///
/// Records are indexed by time as well as by name, so stale names are found without visiting fresh ones.
#[derive(Debug, Default)]
pub(super) struct UsageTracker {
    last_touched: HashMap<String, Instant>,
    by_time: BTreeSet<(Instant, String)>,
}

impl UsageTracker {
    /// Records `now` as the last-touched time of `name`.
    pub(super) fn touch(&mut self, name: &str, now: Instant) {
        if let Some(previous) = self.last_touched.get_mut(name) {
            let previous = std::mem::replace(previous, now);
            let name = self
                .by_time
                .take(&(previous, name.to_string()))
                .map_or_else(|| name.to_string(), |(_, name)| name);
            self.by_time.insert((now, name));
        } else {
            self.last_touched.insert(name.to_string(), now);
            self.by_time.insert((now, name.to_string()));
        }
    }

    /// Returns true if the record is older than `stale_timeout` at `now`.
    fn is_stale(touched: Instant, now: Instant, stale_timeout: Duration) -> bool {
        now.saturating_duration_since(touched) > stale_timeout
    }

    /// Returns the stale records, oldest first.
    pub(super) fn stale(&self, now: Instant, stale_timeout: Duration) -> Vec<(String, Instant)> {
        self.by_time
            .iter()
            .take_while(|(touched, _)| Self::is_stale(*touched, now, stale_timeout))
            .map(|(touched, name)| (name.clone(), *touched))
            .collect()
    }

    /// Returns true if any record is stale.
    pub(super) fn has_stale(&self, now: Instant, stale_timeout: Duration) -> bool {
        self.by_time
            .first()
            .is_some_and(|(touched, _)| Self::is_stale(*touched, now, stale_timeout))
    }

    /// Removes the record of `name` if it was last touched at `touched`.
    ///
    /// A record touched again since it was found stale is kept.
    pub(super) fn forget(&mut self, name: &str, touched: Instant) -> bool {
        if self.last_touched.get(name) == Some(&touched) {
            self.last_touched.remove(name);
            self.by_time.remove(&(touched, name.to_string()));
            true
        } else {
            false
        }
    }

    /// Moves the record of `name` to `now` if it was last touched at `touched`.
    ///
    /// Used for names whose lock is still in use, so later passes do not scan them again until they are stale at `now`.
    pub(super) fn defer(&mut self, name: &str, touched: Instant, now: Instant) -> bool {
        if self.last_touched.get(name) == Some(&touched) {
            self.touch(name, now);
            true
        } else {
            false
        }
    }

    pub(super) fn contains(&self, name: &str) -> bool {
        self.last_touched.contains_key(name)
    }

    pub(super) fn len(&self) -> usize {
        self.last_touched.len()
    }
}
