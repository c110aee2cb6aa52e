/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `keyflake` can emit.
///
/// Configuration and identity errors surface once, at start-up. Everything
/// else surfaces from an allocation call and is fatal for that call: the
/// allocator never retries on the caller's behalf and never hands out an id it
/// cannot vouch for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The supplied options cannot describe a valid generator (bit widths
    /// overflow 63 bits, a width is negative, an explicit id does not fit its
    /// field, the epoch lies in the future, ...).
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// Human-readable description of the offending option.
        reason: String,
    },

    /// The clock reported a tick earlier than the last tick this allocator
    /// issued an id for.
    ///
    /// Issuing an id now could reuse a sequence value that has already been
    /// handed out, so the call fails instead. `drift` is measured in ticks of
    /// the configured resolution.
    #[error("clock moved backwards by {drift} tick(s); refusing to allocate")]
    ClockRolledBack {
        /// How far behind the last issued tick the clock currently is.
        drift: u64,
    },

    /// Hardware-derived identity was requested, the host exposed no usable
    /// identifier, and the random fallback is disabled.
    #[error("unable to derive a worker/datacenter identity from the host")]
    IdentityAssignment,

    /// The elapsed ticks since the epoch no longer fit the timestamp field.
    #[error("timestamp {timestamp} exceeds the layout maximum of {max}")]
    TimestampOverflow {
        /// Elapsed ticks since the epoch.
        timestamp: u64,
        /// Largest value the timestamp field can hold.
        max: u64,
    },

    /// A component handed to [`BitLayout::compose`] does not fit its field.
    ///
    /// [`BitLayout::compose`]: crate::BitLayout::compose
    #[error("{component} value {value} is out of range (max {max})")]
    ComponentOutOfRange {
        /// Name of the field (`timestamp`, `datacenter_id`, ...).
        component: &'static str,
        /// The rejected value.
        value: u64,
        /// The largest value accepted for that field.
        max: u64,
    },

    /// The background producer of the cached strategy could not be started.
    #[error("failed to start the id cache producer: {reason}")]
    ProducerSpawn {
        /// The underlying OS error, rendered.
        reason: String,
    },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
