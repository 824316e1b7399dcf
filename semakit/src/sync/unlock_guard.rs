use super::Lockable;

/// Temporarily releases a held lock for the lifetime of the guard.
///
/// The lock is unlocked when the guard is created and locked again when it is dropped,
/// so a long operation inside a critical section can run without holding the lock.
#[must_use = "dropping the guard immediately relocks"]
pub struct UnlockGuard<'a, L: Lockable + ?Sized> {
    lock: &'a L,
}

impl<'a, L: Lockable + ?Sized> UnlockGuard<'a, L> {
    /// # Safety
    ///
    /// `lock` must be held by the current context.
    pub unsafe fn new(lock: &'a L) -> Self {
        unsafe { lock.unlock() };
        Self { lock }
    }
}

impl<L: Lockable + ?Sized> Drop for UnlockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.lock();
    }
}
