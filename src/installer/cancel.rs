// src/installer/cancel.rs

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared flag that stops a run from dispatching further packages
///
/// Clones share the same flag. Packages already being installed finish
/// their current attempt; nothing new is started and pending backoff
/// waits end early.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wakeup: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every thread blocked in [`wait_for`](Self::wait_for)
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock();
        self.inner.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Block for up to `timeout`, returning early on cancellation
    ///
    /// Returns whether the token was cancelled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.inner.lock.lock();

        while !self.is_cancelled() {
            match deadline {
                Some(deadline) => {
                    if self.inner.wakeup.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.inner.wakeup.wait(&mut guard),
            }
        }

        self.is_cancelled()
    }
}
