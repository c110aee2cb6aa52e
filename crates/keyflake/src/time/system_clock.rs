use std::time::{SystemTime, UNIX_EPOCH};

use crate::TimeSource;

/// Reads the operating system's wall clock on every call.
///
/// The wall clock can be stepped backwards (NTP corrections, manual changes,
/// VM migration). Allocators detect that and fail with
/// [`Error::ClockRolledBack`] rather than risk reissuing an id. Use
/// [`MonotonicClock`] if you would rather never observe a rollback.
///
/// A clock set before 1970 reads as `0`.
///
/// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
/// [`MonotonicClock`]: crate::MonotonicClock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}
