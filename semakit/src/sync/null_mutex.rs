use std::{cell::Cell, marker::PhantomData, time::Duration, time::Instant};

use super::{Lockable, SharedLockable};

/// A lock that does nothing, for code paths known to be single-threaded.
///
/// Every lock operation succeeds immediately. It is `!Sync`, so it can never end up
/// guarding data shared between threads.
#[derive(Debug, Default)]
pub struct NullMutex {
    _not_sync: PhantomData<Cell<()>>,
}

impl NullMutex {
    pub const fn new() -> Self {
        Self {
            _not_sync: PhantomData,
        }
    }

    pub fn try_lock_for(&self, _timeout: Duration) -> bool {
        true
    }

    pub fn try_lock_until(&self, _deadline: Instant) -> bool {
        true
    }

    pub fn try_lock_shared_for(&self, _timeout: Duration) -> bool {
        true
    }

    pub fn try_lock_shared_until(&self, _deadline: Instant) -> bool {
        true
    }
}

unsafe impl Lockable for NullMutex {
    #[inline(always)]
    fn lock(&self) {}

    #[inline(always)]
    fn try_lock(&self) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn unlock(&self) {}
}

unsafe impl SharedLockable for NullMutex {
    #[inline(always)]
    fn lock_shared(&self) {}

    #[inline(always)]
    fn try_lock_shared(&self) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn unlock_shared(&self) {}
}
