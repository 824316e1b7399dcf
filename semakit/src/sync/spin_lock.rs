use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::lock_api::{self, GuardSend};

use super::Lockable;

/// Busy-waiting exclusive lock over a single flag.
///
/// Meant for critical sections of a handful of instructions; waiters burn CPU and
/// yield their time slice between attempts.
pub struct SpinLock {
    locked: AtomicBool,
}

/// Data-carrying mutex on top of [`SpinLock`].
pub type SpinMutex<T> = lock_api::Mutex<SpinLock, T>;
pub type SpinMutexGuard<'a, T> = lock_api::MutexGuard<'a, SpinLock, T>;

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for SpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            while self.locked.load(Ordering::Relaxed) {
                std::thread::yield_now();
            }
        }
    }

    fn try_lock(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

unsafe impl Lockable for SpinLock {
    fn lock(&self) {
        lock_api::RawMutex::lock(self);
    }

    fn try_lock(&self) -> bool {
        lock_api::RawMutex::try_lock(self)
    }

    unsafe fn unlock(&self) {
        lock_api::RawMutex::unlock(self);
    }
}
