//! Lightweight semaphore that spins before it blocks.
//!
//! [`SpinningSemaphore`] keeps its token count in one atomic integer and only falls back
//! to a [`NativeSemaphore`] once a waiter has spun for its whole budget without seeing a
//! token. When tokens are available, or show up within a few hundred spins, acquiring
//! and releasing never enters the kernel.
//!
//! The counter holds the number of available tokens minus the number of threads blocked
//! in the kernel, so it goes negative while anyone is blocked. `signal` only posts to the
//! kernel semaphore for the part of a release that covers blocked threads.
//!
//! No fairness is provided: a thread that is still spinning can take a token ahead of a
//! thread that has been blocked in the kernel for longer.
use std::{
    hint,
    sync::atomic::{AtomicIsize, Ordering},
};

use crate::{
    deadline::Deadline,
    semaphore::{NativeSemaphore, Semaphore},
};

/// Number of fast-path retries before a waiter blocks. Picked empirically;
/// tune with the `semakit` stress binary on the target hardware.
pub const DEFAULT_SPIN_BUDGET: u32 = 256;

/// Counting semaphore with a lock-free fast path and a kernel-backed slow path.
///
/// Holds one [`NativeSemaphore`] that waiters block on only after spinning for
/// [`spin_budget`](Self::spin_budget) attempts. Like the native semaphore it is not
/// `Clone`.
pub struct SpinningSemaphore {
    count: AtomicIsize,
    sema: NativeSemaphore,
    spin_budget: u32,
}

impl SpinningSemaphore {
    /// Creates a semaphore with `initial_count` tokens and [`DEFAULT_SPIN_BUDGET`].
    ///
    /// # Panics
    ///
    /// Panics if the kernel refuses to create the backing semaphore.
    pub fn new(initial_count: u32) -> Self {
        Self::with_spin_budget(initial_count, DEFAULT_SPIN_BUDGET)
    }

    /// Like [`new`](Self::new), with `spin_budget` fast-path retries before blocking.
    pub fn with_spin_budget(initial_count: u32, spin_budget: u32) -> Self {
        Self {
            count: AtomicIsize::new(tokens(initial_count)),
            sema: NativeSemaphore::new(0),
            spin_budget,
        }
    }

    pub fn spin_budget(&self) -> u32 {
        self.spin_budget
    }

    /// Snapshot of the logical counter: available tokens minus kernel-blocked waiters.
    ///
    /// Only meaningful while no other thread is using the semaphore.
    pub fn available(&self) -> isize {
        self.count.load(Ordering::Relaxed)
    }

    fn try_acquire(&self) -> bool {
        let mut old = self.count.load(Ordering::Relaxed);
        while old > 0 {
            match self.count.compare_exchange_weak(
                old,
                old - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => old = current,
            }
        }
        false
    }

    fn spin_acquire(&self) -> bool {
        for _ in 0..self.spin_budget {
            if self.try_acquire() {
                return true;
            }
            hint::spin_loop();
        }
        false
    }

    /// Takes a slot in the counter. Returns `true` if that slot was a token, `false` if
    /// the caller is now registered as a blocked waiter and must get a kernel token.
    fn reserve(&self) -> bool {
        self.count.fetch_sub(1, Ordering::Acquire) > 0
    }

    /// Gives up a waiter slot taken by [`reserve`](Self::reserve) after a timeout.
    ///
    /// If a concurrent `signal` already counted this waiter, its kernel token is on the
    /// way and is consumed instead, so the wait succeeds after all.
    fn cancel_reservation(&self) -> bool {
        let mut old = self.count.load(Ordering::Relaxed);
        loop {
            if old < 0 {
                match self.count.compare_exchange_weak(
                    old,
                    old + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        log::trace!("timed wait gave up its reservation");
                        return false;
                    }
                    Err(current) => old = current,
                }
            } else {
                if self.sema.try_wait() {
                    return true;
                }
                hint::spin_loop();
                old = self.count.load(Ordering::Relaxed);
            }
        }
    }
}

/// Token count as a counter delta. Counts that do not fit a signed word (32-bit
/// targets only) are a contract violation and saturate.
fn tokens(count: u32) -> isize {
    debug_assert!(isize::try_from(count).is_ok(), "token count {count} overflows isize");
    isize::try_from(count).unwrap_or(isize::MAX)
}

impl Default for SpinningSemaphore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Semaphore for SpinningSemaphore {
    fn wait(&self) {
        if self.try_acquire() || self.spin_acquire() {
            return;
        }
        if !self.reserve() {
            log::trace!("spin budget of {} exhausted, blocking", self.spin_budget);
            self.sema.wait();
        }
    }

    fn try_wait(&self) -> bool {
        self.try_acquire()
    }

    fn try_wait_deadline(&self, deadline: Deadline) -> bool {
        if self.try_acquire() {
            return true;
        }
        if deadline.has_elapsed() {
            return false;
        }
        if self.spin_acquire() {
            return true;
        }
        if deadline.has_elapsed() {
            return false;
        }
        if self.reserve() {
            return true;
        }
        log::trace!("spin budget of {} exhausted, blocking with deadline", self.spin_budget);
        self.sema.try_wait_deadline(deadline) || self.cancel_reservation()
    }

    fn signal(&self, count: u32) {
        debug_assert!(count >= 1, "semaphore signalled with a zero count");
        let released = tokens(count);
        let old = self.count.fetch_add(released, Ordering::Release);
        if old < 0 {
            let to_wake = released.min(-old);
            self.sema.signal(to_wake as u32);
        }
    }
}

impl std::fmt::Debug for SpinningSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinningSemaphore")
            .field("count", &self.available())
            .field("spin_budget", &self.spin_budget)
            .finish()
    }
}
