//! Counting semaphore backed by the operating system.
//!
//! Exactly one backend is compiled per target:
//!
//! - Apple targets use Mach semaphores (`semaphore_create` and friends). Unnamed POSIX
//!   semaphores are not implemented there.
//! - Every other Unix-like target, plus Fuchsia, uses unnamed POSIX semaphores
//!   (`sem_init`).
//! - Windows uses a kernel semaphore object (`CreateSemaphoreW`).
//!
//! Targets outside of these fail to build.
//!
//! The count lives in the kernel. Waking order of blocked threads is whatever the kernel
//! provides and must not be assumed to be FIFO.
use std::time::{Duration, Instant};

use crate::deadline::Deadline;

cfgenius::cond! {
    if macro(crate::macros::darwin) {
        mod mach;
        use mach::RawSemaphore;
    } else if macro(crate::macros::posix_semaphores) {
        mod posix;
        use posix::RawSemaphore;
    } else if macro(crate::macros::win32_semaphores) {
        mod win32;
        use win32::RawSemaphore;
    } else {
        compile_error!("semakit: no native semaphore implementation for this target");
    }
}

/// The blocking counting-semaphore contract shared by [`NativeSemaphore`] and
/// [`SpinningSemaphore`](crate::spinning::SpinningSemaphore).
///
/// Timed waits report a timeout as `false`. Interrupted or spurious kernel returns are
/// retried internally and are never visible to the caller.
pub trait Semaphore: Send + Sync {
    /// Blocks until a token is available and consumes it.
    fn wait(&self);

    /// Consumes a token if one is available right now. Never blocks.
    fn try_wait(&self) -> bool;

    /// Waits for a token until `deadline`. Returns `false` if the deadline passed
    /// without a token being consumed. An already elapsed deadline never blocks.
    fn try_wait_deadline(&self, deadline: Deadline) -> bool;

    fn try_wait_for(&self, timeout: Duration) -> bool {
        self.try_wait_deadline(Deadline::after(timeout))
    }

    fn try_wait_until(&self, instant: Instant) -> bool {
        self.try_wait_deadline(Deadline::at(instant))
    }

    /// Releases `count` tokens, waking up to `count` blocked waiters.
    ///
    /// `count` must be at least 1.
    fn signal(&self, count: u32);
}

/// A counting semaphore owning one kernel semaphore object.
///
/// The kernel object is created in [`NativeSemaphore::new`] and released on drop. The
/// type is deliberately not `Clone`: each value owns exactly one kernel handle.
pub struct NativeSemaphore {
    raw: RawSemaphore,
}

impl NativeSemaphore {
    /// Creates a semaphore with `initial_count` tokens available.
    ///
    /// # Panics
    ///
    /// Panics if the kernel refuses to create the semaphore.
    pub fn new(initial_count: u32) -> Self {
        Self {
            raw: RawSemaphore::new(initial_count),
        }
    }
}

impl Default for NativeSemaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Semaphore for NativeSemaphore {
    fn wait(&self) {
        self.raw.wait();
    }

    fn try_wait(&self) -> bool {
        self.raw.try_wait()
    }

    fn try_wait_deadline(&self, deadline: Deadline) -> bool {
        match deadline.remaining() {
            None => {
                self.raw.wait();
                true
            }
            Some(left) if left.is_zero() => self.raw.try_wait(),
            Some(_) => self.raw.timed_wait(&deadline),
        }
    }

    fn signal(&self, count: u32) {
        debug_assert!(count >= 1, "semaphore signalled with a zero count");
        self.raw.signal(count);
    }
}

impl std::fmt::Debug for NativeSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSemaphore").finish_non_exhaustive()
    }
}
