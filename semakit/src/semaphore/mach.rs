use crate::deadline::{relative_timespec, Deadline};

type SemaphoreT = libc::mach_port_t;

const KERN_SUCCESS: libc::c_int = 0;
const KERN_ABORTED: libc::c_int = 14;
const KERN_OPERATION_TIMED_OUT: libc::c_int = 49;
const SYNC_POLICY_FIFO: libc::c_int = 0;

#[repr(C)]
#[derive(Clone, Copy)]
struct MachTimespec {
    tv_sec: libc::c_uint,
    tv_nsec: libc::c_int,
}

extern "C" {
    static mach_task_self_: libc::mach_port_t;

    fn semaphore_create(
        task: libc::mach_port_t,
        semaphore: *mut SemaphoreT,
        policy: libc::c_int,
        value: libc::c_int,
    ) -> libc::c_int;
    fn semaphore_destroy(task: libc::mach_port_t, semaphore: SemaphoreT) -> libc::c_int;
    fn semaphore_signal(semaphore: SemaphoreT) -> libc::c_int;
    fn semaphore_wait(semaphore: SemaphoreT) -> libc::c_int;
    fn semaphore_timedwait(semaphore: SemaphoreT, wait_time: MachTimespec) -> libc::c_int;
}

fn task_self() -> libc::mach_port_t {
    unsafe { mach_task_self_ }
}

/// Mach kernel semaphore. The handle is a port name, so the owner may move freely.
pub(super) struct RawSemaphore {
    port: SemaphoreT,
}

unsafe impl Send for RawSemaphore {}
unsafe impl Sync for RawSemaphore {}

impl RawSemaphore {
    pub fn new(initial_value: u32) -> Self {
        let mut port: SemaphoreT = 0;
        let value = libc::c_int::try_from(initial_value).unwrap_or(libc::c_int::MAX);
        let rc = unsafe { semaphore_create(task_self(), &mut port, SYNC_POLICY_FIFO, value) };
        if rc != KERN_SUCCESS {
            log::error!("semaphore_create({initial_value}) failed: kern_return_t {rc}");
            panic!("semaphore_create failed:{}", rc);
        }
        Self { port }
    }

    pub fn wait(&self) {
        loop {
            match unsafe { semaphore_wait(self.port) } {
                KERN_SUCCESS => return,
                KERN_ABORTED => continue,
                rc => panic!("semaphore_wait failed:{}", rc),
            }
        }
    }

    pub fn try_wait(&self) -> bool {
        loop {
            if let Some(acquired) = self.timed_wait_once(std::time::Duration::ZERO) {
                return acquired;
            }
        }
    }

    /// `semaphore_timedwait` takes a relative timeout. An aborted wait is retried with
    /// whatever is left of the deadline.
    pub fn timed_wait(&self, deadline: &Deadline) -> bool {
        loop {
            let Some(left) = deadline.remaining() else {
                self.wait();
                return true;
            };
            if left.is_zero() {
                return self.try_wait();
            }
            match self.timed_wait_once(left) {
                Some(true) => return true,
                // A saturated timeout ends early; keep going until the real deadline.
                Some(false) if !deadline.has_elapsed() => continue,
                Some(false) => return false,
                None => continue,
            }
        }
    }

    /// `Some(acquired)` for a definite answer, `None` if the call was aborted.
    fn timed_wait_once(&self, timeout: std::time::Duration) -> Option<bool> {
        let (tv_sec, tv_nsec) = relative_timespec(timeout);
        match unsafe { semaphore_timedwait(self.port, MachTimespec { tv_sec, tv_nsec }) } {
            KERN_SUCCESS => Some(true),
            KERN_OPERATION_TIMED_OUT => Some(false),
            KERN_ABORTED => None,
            rc => panic!("semaphore_timedwait failed:{}", rc),
        }
    }

    pub fn signal(&self, count: u32) {
        for _ in 0..count {
            let rc = unsafe { semaphore_signal(self.port) };
            if rc != KERN_SUCCESS {
                panic!("semaphore_signal failed:{}", rc);
            }
        }
    }
}

impl Drop for RawSemaphore {
    fn drop(&mut self) {
        unsafe {
            semaphore_destroy(task_self(), self.port);
        }
    }
}
