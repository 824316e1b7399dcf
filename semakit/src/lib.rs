//! Counting semaphores over the native kernel primitive of each platform, plus a
//! spin-then-block semaphore that avoids the kernel when tokens are readily available.
//!
//! - [`NativeSemaphore`]: a kernel semaphore (Mach, POSIX or Win32, picked at build time).
//! - [`SpinningSemaphore`]: an atomic counter in front of a [`NativeSemaphore`].
//! - [`sync`]: small locks that are used alongside the semaphores.
//!
//! Both semaphores implement the [`Semaphore`] trait:
//!
//! ```
//! use semakit::prelude::*;
//! use std::time::Duration;
//!
//! let sema = SpinningSemaphore::new(1);
//! sema.wait();
//! assert!(!sema.try_wait_for(Duration::from_millis(1)));
//! sema.signal(1);
//! ```
pub mod deadline;
pub mod macros;
pub mod options;
pub mod semaphore;
pub mod spinning;
pub mod stress;
pub mod sync;

pub use deadline::Deadline;
pub use semaphore::{NativeSemaphore, Semaphore};
pub use spinning::{SpinningSemaphore, DEFAULT_SPIN_BUDGET};

pub mod prelude {
    pub use super::deadline::Deadline;
    pub use super::semaphore::{NativeSemaphore, Semaphore};
    pub use super::spinning::SpinningSemaphore;
    pub use super::sync::{Lockable, SharedLockable};
}
