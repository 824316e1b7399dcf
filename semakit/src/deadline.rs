//! Deadlines for timed waits.
//!
//! Every timed wait in the crate computes its [`Deadline`] once, on entry, and asks it
//! for the remaining budget each time the underlying kernel call returns early. Kernel
//! calls want that budget in different shapes, so the conversions live here too:
//! POSIX wants an absolute `CLOCK_REALTIME` timespec, Mach wants a relative timespec
//! with 32-bit seconds, Win32 wants a capped number of milliseconds.
use std::time::{Duration, Instant};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A point in time after which a timed wait gives up.
///
/// A deadline that cannot be represented as an [`Instant`] (e.g. `Duration::MAX`
/// from now) never elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    instant: Option<Instant>,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            instant: Instant::now().checked_add(timeout),
        }
    }

    pub const fn at(instant: Instant) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    pub fn is_never(&self) -> bool {
        self.instant.is_none()
    }

    /// Time left until the deadline, `None` if it never elapses. Once the deadline
    /// has passed this is `Some(Duration::ZERO)`.
    pub fn remaining(&self) -> Option<Duration> {
        self.instant
            .map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    pub fn has_elapsed(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

/// Adds `offset` to a `(seconds, nanoseconds)` pair, carrying whole seconds out of the
/// nanosecond field. Seconds saturate instead of wrapping.
///
/// `nanos` must already be normalized to `0..1_000_000_000`.
#[cfg_attr(not(any(unix, target_os = "fuchsia")), allow(dead_code))]
#[cfg_attr(target_vendor = "apple", allow(dead_code))]
pub(crate) fn add_to_timespec(secs: i64, nanos: i64, offset: Duration) -> (i64, i64) {
    debug_assert!((0..NANOS_PER_SEC).contains(&nanos));
    let offset_secs = i64::try_from(offset.as_secs()).unwrap_or(i64::MAX);
    let mut secs = secs.saturating_add(offset_secs);
    let mut nanos = nanos + i64::from(offset.subsec_nanos());
    if nanos >= NANOS_PER_SEC {
        nanos -= NANOS_PER_SEC;
        secs = secs.saturating_add(1);
    }
    (secs, nanos)
}

/// Splits a relative timeout into the `(seconds, nanoseconds)` fields of a Mach
/// timespec. Seconds saturate at `u32::MAX`; a saturated timeout is just a shorter
/// wait that the caller retries.
#[cfg_attr(not(target_vendor = "apple"), allow(dead_code))]
pub(crate) fn relative_timespec(timeout: Duration) -> (u32, i32) {
    match u32::try_from(timeout.as_secs()) {
        Ok(secs) => (secs, timeout.subsec_nanos() as i32),
        Err(_) => (u32::MAX, 0),
    }
}

/// Converts a timeout to whole milliseconds for `WaitForSingleObject`.
///
/// Sub-millisecond remainders round up so that a wait never returns before its
/// deadline. The result is capped at `max_millis`, which callers set just below
/// `INFINITE`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn capped_millis(timeout: Duration, max_millis: u32) -> u32 {
    let mut millis = timeout.as_millis();
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    u32::try_from(millis).unwrap_or(max_millis).min(max_millis)
}
