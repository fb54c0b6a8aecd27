//! A lock observer which prints function calls.

use std::{io::Write, sync::Arc};

use parking_lot::Mutex;

use super::{LockObserver, LockOperation};

/// The usage log lock observer. Logs named lock calls.
///
/// It is intended to aid in debugging lock contention by revealing lock access patterns.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::{io::Write, sync::Arc, time::Duration};
/// # use parking_lot::Mutex;
/// # use named_locks::named_lock::{LockManager, LockManagerOptions};
/// # use named_locks::observer::UsageLogObserver;
/// let log_writer: Arc<Mutex<dyn Write + Send + Sync>> = Arc::new(Mutex::new(
///     // std::io::BufWriter::new(
///     std::io::stdout(),
///     //    )
/// ));
/// let observer = Arc::new(UsageLogObserver::new(log_writer, || {
///     chrono::Utc::now().format("[%T%.3f] ").to_string()
/// }));
/// let locks = LockManager::with_options(
///     LockManagerOptions::new(Duration::from_secs(600)).with_observer(observer),
/// );
/// locks.write_lock("volume/a");
/// locks.write_unlock("volume/a");
/// ```
///
/// The above prints outputs like:
/// ```text
/// [23:41:19.885] write_lock(volume/a)
/// [23:41:19.885] write_lock(volume/a) -> acquired
/// [23:41:19.885] write_unlock(volume/a)
/// [23:41:19.885] write_unlock(volume/a) -> released
/// ```
pub struct UsageLogObserver {
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl core::fmt::Debug for UsageLogObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl UsageLogObserver {
    /// Create a new usage log observer.
    pub fn new(handle: Arc<Mutex<dyn Write + Send + Sync>>, prefix_func: fn() -> String) -> Self {
        Self {
            handle,
            prefix_func,
        }
    }
}

impl LockObserver for UsageLogObserver {
    // Write failures are ignored, the log must never interfere with locking.
    fn enter(&self, operation: LockOperation, name: &str) {
        let _ = writeln!(
            self.handle.lock(),
            "{}{operation}({name})",
            (self.prefix_func)()
        );
    }

    fn exit(&self, operation: LockOperation, name: &str) {
        let outcome = if operation.is_lock() {
            "acquired"
        } else {
            "released"
        };
        let _ = writeln!(
            self.handle.lock(),
            "{}{operation}({name}) -> {outcome}",
            (self.prefix_func)()
        );
    }

    fn reaped(&self, name: &str) {
        let _ = writeln!(self.handle.lock(), "{}reaped({name})", (self.prefix_func)());
    }
}
