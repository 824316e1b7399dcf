use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-shot event: threads block in `wait*` until some thread calls [`signal`].
///
/// Once signalled the event stays signalled; every later wait returns immediately.
///
/// [`signal`]: WaitableEvent::signal
#[derive(Debug, Default)]
pub struct WaitableEvent {
    signalled: Mutex<bool>,
    cvar: Condvar,
}

impl WaitableEvent {
    pub const fn new() -> Self {
        Self {
            signalled: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    pub fn wait(&self) {
        let mut signalled = self.signalled.lock();
        while !*signalled {
            self.cvar.wait(&mut signalled);
        }
    }

    /// Returns `false` if `timeout` passed before the event was signalled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => {
                self.wait();
                true
            }
        }
    }

    /// Returns `false` if `deadline` passed before the event was signalled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut signalled = self.signalled.lock();
        while !*signalled {
            if self.cvar.wait_until(&mut signalled, deadline).timed_out() {
                return *signalled;
            }
        }
        true
    }

    pub fn signal(&self) {
        *self.signalled.lock() = true;
        self.cvar.notify_all();
    }

    pub fn is_signalled(&self) -> bool {
        *self.signalled.lock()
    }
}
