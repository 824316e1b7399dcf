//! Small locks that sit next to the semaphores.
//!
//! Code that takes a lock as a type parameter bounds it on [`Lockable`] (exclusive) or
//! [`SharedLockable`] (reader/writer). Both traits are implemented for the raw
//! `parking_lot` locks, for [`SpinLock`] and for [`NullMutex`], so single-threaded paths
//! can pass a lock that compiles away.
pub mod null_mutex;
pub mod spin_lock;
pub mod unlock_guard;
pub mod waitable_event;

pub use null_mutex::*;
pub use spin_lock::*;
pub use unlock_guard::*;
pub use waitable_event::*;

use parking_lot::lock_api::RawRwLock as _;

/// Standard reader/writer lock.
pub type SharedMutex<T> = parking_lot::RwLock<T>;
/// The raw lock behind [`SharedMutex`], for use as a bare [`SharedLockable`].
pub type RawSharedMutex = parking_lot::RawRwLock;

/// Exclusive lock capability: `lock`, `try_lock`, `unlock`.
///
/// # Safety
///
/// Implementations that are `Sync` must provide mutual exclusion between `lock` (or a
/// successful `try_lock`) and the matching `unlock`.
pub unsafe trait Lockable {
    fn lock(&self);
    fn try_lock(&self) -> bool;
    /// # Safety
    ///
    /// The lock must be held by the current context.
    unsafe fn unlock(&self);
}

/// Shared (reader) lock capability on top of [`Lockable`].
///
/// # Safety
///
/// Same as [`Lockable`], for the shared side: a shared holder excludes exclusive ones.
pub unsafe trait SharedLockable: Lockable {
    fn lock_shared(&self);
    fn try_lock_shared(&self) -> bool;
    /// # Safety
    ///
    /// A shared lock must be held by the current context.
    unsafe fn unlock_shared(&self);
}

unsafe impl Lockable for parking_lot::RawMutex {
    fn lock(&self) {
        parking_lot::lock_api::RawMutex::lock(self);
    }

    fn try_lock(&self) -> bool {
        parking_lot::lock_api::RawMutex::try_lock(self)
    }

    unsafe fn unlock(&self) {
        parking_lot::lock_api::RawMutex::unlock(self);
    }
}

unsafe impl Lockable for RawSharedMutex {
    fn lock(&self) {
        self.lock_exclusive();
    }

    fn try_lock(&self) -> bool {
        self.try_lock_exclusive()
    }

    unsafe fn unlock(&self) {
        self.unlock_exclusive();
    }
}

unsafe impl SharedLockable for RawSharedMutex {
    fn lock_shared(&self) {
        parking_lot::lock_api::RawRwLock::lock_shared(self);
    }

    fn try_lock_shared(&self) -> bool {
        parking_lot::lock_api::RawRwLock::try_lock_shared(self)
    }

    unsafe fn unlock_shared(&self) {
        parking_lot::lock_api::RawRwLock::unlock_shared(self);
    }
}
