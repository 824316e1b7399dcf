use std::ptr::null_mut;

use winapi::shared::winerror::WAIT_TIMEOUT;
use winapi::um::handleapi::CloseHandle;
use winapi::um::synchapi::*;
use winapi::um::winbase::*;
use winapi::um::winnt::{HANDLE, LONG};

use crate::deadline::{capped_millis, Deadline};

/// Longest finite wait `WaitForSingleObject` accepts; `INFINITE` itself means "forever".
const MAX_WAIT_MILLIS: u32 = INFINITE - 1;

/// Win32 kernel semaphore object.
pub(super) struct RawSemaphore {
    handle: HANDLE,
}

unsafe impl Send for RawSemaphore {}
unsafe impl Sync for RawSemaphore {}

impl RawSemaphore {
    pub fn new(initial_value: u32) -> Self {
        debug_assert!(initial_value <= LONG::MAX as u32);
        let initial = LONG::try_from(initial_value).unwrap_or(LONG::MAX);
        let handle = unsafe { CreateSemaphoreW(null_mut(), initial, LONG::MAX, null_mut()) };
        if handle.is_null() {
            let err = std::io::Error::last_os_error();
            log::error!("CreateSemaphoreW({initial_value}) failed: {err}");
            panic!("CreateSemaphoreW failed:{}", err);
        }
        Self { handle }
    }

    fn wait_millis(&self, millis: u32) -> bool {
        match unsafe { WaitForSingleObject(self.handle, millis) } {
            WAIT_OBJECT_0 => true,
            WAIT_TIMEOUT => false,
            rc => panic!(
                "WaitForSingleObject failed:{} ({})",
                rc,
                std::io::Error::last_os_error()
            ),
        }
    }

    pub fn wait(&self) {
        let acquired = self.wait_millis(INFINITE);
        debug_assert!(acquired);
    }

    pub fn try_wait(&self) -> bool {
        self.wait_millis(0)
    }

    /// Durations longer than `MAX_WAIT_MILLIS` are waited for in capped slices.
    pub fn timed_wait(&self, deadline: &Deadline) -> bool {
        loop {
            let Some(left) = deadline.remaining() else {
                self.wait();
                return true;
            };
            if left.is_zero() {
                return self.try_wait();
            }
            if self.wait_millis(capped_millis(left, MAX_WAIT_MILLIS)) {
                return true;
            }
            if deadline.has_elapsed() {
                return false;
            }
        }
    }

    pub fn signal(&self, count: u32) {
        let count = LONG::try_from(count).unwrap_or(LONG::MAX);
        if unsafe { ReleaseSemaphore(self.handle, count, null_mut()) } == 0 {
            panic!("ReleaseSemaphore failed:{}", std::io::Error::last_os_error());
        }
    }
}

impl Drop for RawSemaphore {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}
