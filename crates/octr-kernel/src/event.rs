//! One-shot readiness events

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// One-shot kernel event
///
/// Services hand these out so that clients can block until a condition
/// becomes true (a parameter arriving, a notification being posted).
/// Waiting consumes the signal, matching the console's one-shot reset
/// type.
pub struct Event {
    name: &'static str,
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the event, waking one waiter if any
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        tracing::trace!("Event {}: signaled", self.name);
        self.condvar.notify_one();
    }

    /// Clear a pending signal without waking anyone
    pub fn clear(&self) {
        *self.signaled.lock() = false;
    }

    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }

    /// Wait for the event to be signaled, consuming the signal.
    /// Returns false if the timeout elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            let result = self.condvar.wait_for(&mut signaled, timeout);
            if result.timed_out() && !*signaled {
                return false;
            }
        }
        *signaled = false;
        true
    }
}
