//! Cooperative cancellation for blocking waits.
//!
//! The command channel spends most of a send inside fixed settle delays
//! between AT commands. `CancelToken` lets shutdown interrupt those delays
//! instead of sleeping through them.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag with a condvar for waking blocked waiters.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token cancelled and wake every blocked waiter.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block for up to `duration`, returning early on cancellation.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the token
    /// was cancelled first (or was already cancelled on entry).
    pub fn wait_for(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        loop {
            if *cancelled {
                return false;
            }
            if self
                .inner
                .condvar
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                // Cancellation can land exactly at the deadline.
                return !*cancelled;
            }
        }
    }
}
