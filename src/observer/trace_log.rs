use tracing::trace;

use super::{LockObserver, LockOperation};

/// A lock observer which emits `trace` level [`tracing`] events on entry and exit of every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LockObserver for TracingObserver {
    fn enter(&self, operation: LockOperation, name: &str) {
        trace!(lock_name = name, %operation, "enter");
    }

    fn exit(&self, operation: LockOperation, name: &str) {
        trace!(lock_name = name, %operation, "exit");
    }

    fn reaped(&self, name: &str) {
        trace!(lock_name = name, "reaped");
    }
}
