use std::{cell::UnsafeCell, mem::MaybeUninit};

use crate::deadline::{add_to_timespec, Deadline};

/// Unnamed POSIX semaphore.
///
/// `sem_t` must stay at the address it was initialized at, so it lives in its own heap
/// allocation and moving the owner never moves the kernel object.
pub(super) struct RawSemaphore {
    platform_sema: Box<UnsafeCell<libc::sem_t>>,
}

unsafe impl Send for RawSemaphore {}
unsafe impl Sync for RawSemaphore {}

impl RawSemaphore {
    pub fn new(initial_value: u32) -> Self {
        let platform_sema: Box<UnsafeCell<MaybeUninit<libc::sem_t>>> =
            Box::new(UnsafeCell::new(MaybeUninit::uninit()));
        unsafe {
            if libc::sem_init(platform_sema.get().cast(), 0, initial_value) != 0 {
                let err = errno::errno();
                log::error!("sem_init({initial_value}) failed: {err}");
                panic!("sem_init failed:{}", err);
            }
        }

        Self {
            // SAFETY: `sem_init` succeeded, the semaphore is initialized in place.
            platform_sema: unsafe {
                Box::from_raw(Box::into_raw(platform_sema).cast::<UnsafeCell<libc::sem_t>>())
            },
        }
    }

    fn as_ptr(&self) -> *mut libc::sem_t {
        self.platform_sema.get()
    }

    pub fn wait(&self) {
        loop {
            if unsafe { libc::sem_wait(self.as_ptr()) } == 0 {
                return;
            }
            let err = errno::errno();
            if err.0 != libc::EINTR {
                panic!("sem_wait failed:{}", err);
            }
        }
    }

    pub fn try_wait(&self) -> bool {
        loop {
            if unsafe { libc::sem_trywait(self.as_ptr()) } == 0 {
                return true;
            }
            let err = errno::errno();
            match err.0 {
                libc::EINTR => continue,
                libc::EAGAIN => return false,
                _ => panic!("sem_trywait failed:{}", err),
            }
        }
    }

    /// `sem_timedwait` wants an absolute `CLOCK_REALTIME` time. It is rebuilt from the
    /// monotonic deadline on every attempt, so an interrupted wait resumes with the
    /// remaining time and a wall-clock jump only affects a single attempt.
    pub fn timed_wait(&self, deadline: &Deadline) -> bool {
        loop {
            let Some(left) = deadline.remaining() else {
                self.wait();
                return true;
            };
            if left.is_zero() {
                return self.try_wait();
            }

            let abs = realtime_after(left);
            if unsafe { libc::sem_timedwait(self.as_ptr(), &abs) } == 0 {
                return true;
            }
            let err = errno::errno();
            match err.0 {
                libc::EINTR => continue,
                // The realtime clock may disagree with the monotonic one.
                libc::ETIMEDOUT if !deadline.has_elapsed() => continue,
                libc::ETIMEDOUT => return false,
                _ => panic!("sem_timedwait failed:{}", err),
            }
        }
    }

    pub fn signal(&self, count: u32) {
        for _ in 0..count {
            unsafe {
                if libc::sem_post(self.as_ptr()) != 0 {
                    panic!("sem_post failed:{}", errno::errno());
                }
            }
        }
    }
}

impl Drop for RawSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_destroy(self.as_ptr());
        }
    }
}

fn realtime_after(offset: std::time::Duration) -> libc::timespec {
    let mut now = MaybeUninit::<libc::timespec>::uninit();
    let now = unsafe {
        if libc::clock_gettime(libc::CLOCK_REALTIME, now.as_mut_ptr()) != 0 {
            panic!("clock_gettime failed:{}", errno::errno());
        }
        now.assume_init()
    };

    let (secs, nanos) = add_to_timespec(now.tv_sec as i64, now.tv_nsec as i64, offset);
    let mut abs: libc::timespec = unsafe { std::mem::zeroed() };
    abs.tv_sec = libc::time_t::try_from(secs).unwrap_or(libc::time_t::MAX);
    abs.tv_nsec = nanos as _;
    abs
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use std::{
        os::unix::thread::JoinHandleExt,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Once,
        },
        thread,
        time::{Duration, Instant},
    };

    use crate::semaphore::{NativeSemaphore, Semaphore};

    static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_interrupt(_signum: libc::c_int) {
        INTERRUPTS.fetch_add(1, Ordering::Relaxed);
    }

    /// SIGUSR1 handler without `SA_RESTART`, so blocked semaphore calls fail with `EINTR`.
    fn install_handler() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = count_interrupt as usize;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            assert_eq!(
                libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()),
                0
            );
        });
    }

    fn interrupt(target: libc::pthread_t, times: usize) {
        for _ in 0..times {
            thread::sleep(Duration::from_millis(10));
            assert_eq!(unsafe { libc::pthread_kill(target, libc::SIGUSR1) }, 0);
        }
    }

    #[test]
    fn interrupted_wait_keeps_waiting() {
        install_handler();
        let before = INTERRUPTS.load(Ordering::Relaxed);
        let sema = Arc::new(NativeSemaphore::new(0));
        let signalled = Arc::new(AtomicBool::new(false));

        let waiter = {
            let sema = sema.clone();
            let signalled = signalled.clone();
            thread::spawn(move || {
                sema.wait();
                signalled.load(Ordering::Acquire)
            })
        };

        interrupt(waiter.as_pthread_t(), 20);
        assert!(INTERRUPTS.load(Ordering::Relaxed) > before);

        signalled.store(true, Ordering::Release);
        sema.signal(1);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn interrupted_timed_wait_keeps_its_deadline() {
        install_handler();
        let sema = Arc::new(NativeSemaphore::new(0));

        let waiter = {
            let sema = sema.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let acquired = sema.try_wait_for(Duration::from_millis(300));
                (acquired, start.elapsed())
            })
        };

        // Twenty interrupts over ~200ms. Restarting with the full timeout after the
        // last one would stretch the wait to ~500ms.
        interrupt(waiter.as_pthread_t(), 20);
        let (acquired, elapsed) = waiter.join().unwrap();
        assert!(!acquired);
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(480), "{elapsed:?}");
        assert!(!sema.try_wait());
    }
}
