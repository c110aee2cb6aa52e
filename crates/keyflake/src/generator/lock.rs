#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BitLayout, IdAllocator, Identity, Poll, RandSource, Result, ThreadRandom, TimeSource,
    generator::{AllocatorState, Mutex, SequenceSeed, Step},
};

/// A lock-based allocator suitable for multi-threaded environments.
///
/// The whole allocation (clock read, comparison, state update) runs under a
/// single [`Mutex`], so callers are serialized and throughput is bounded by
/// lock hand-off latency.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
/// - ✅ Works on targets without 64-bit atomics
///
/// ## See Also
/// - [`AtomicGenerator`]
/// - [`CachedGenerator`]
///
/// [`AtomicGenerator`]: crate::AtomicGenerator
/// [`CachedGenerator`]: crate::CachedGenerator
pub struct LockGenerator<T, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<AllocatorState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<AllocatorState>,
    layout: BitLayout,
    identity: Identity,
    time: T,
    seed: SequenceSeed<R>,
}

impl<T> LockGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`LockGenerator`] with the default sequence jitter.
    ///
    /// # Example
    /// ```
    /// use keyflake::{BitLayout, IdAllocator, Identity, LockGenerator, Resolution, SystemClock, TWITTER_EPOCH};
    ///
    /// let layout = BitLayout::standard(
    ///     Resolution::Millisecond,
    ///     Resolution::Millisecond.ticks_from_duration(TWITTER_EPOCH),
    /// );
    /// let identity = Identity::new(3, 7, &layout).unwrap();
    /// let generator = LockGenerator::new(layout, identity, SystemClock);
    ///
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(generator.decode(id).worker_id, 3);
    /// ```
    pub fn new(layout: BitLayout, identity: Identity, time: T) -> Self {
        Self::with_seed(layout, identity, time, SequenceSeed::default())
    }
}

impl<T, R> LockGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Creates a new [`LockGenerator`] with an explicit sequence seed.
    pub fn with_seed(layout: BitLayout, identity: Identity, time: T, seed: SequenceSeed<R>) -> Self {
        Self::from_state(layout, identity, AllocatorState::default(), time, seed)
    }

    /// Creates a generator preloaded with `state`.
    ///
    /// Useful for tests and for resuming from a known last-issued tick. In
    /// typical use cases, prefer [`LockGenerator::new`].
    pub fn from_state(
        layout: BitLayout,
        identity: Identity,
        state: AllocatorState,
        time: T,
        seed: SequenceSeed<R>,
    ) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            layout,
            identity,
            time,
            seed,
        }
    }

    /// Attempts to issue the next id without waiting.
    ///
    /// # Errors
    /// - [`Error::ClockRolledBack`] if the clock is behind the last issued
    ///   tick.
    /// - [`Error::TimestampOverflow`] if the timestamp field is exhausted.
    /// - [`Error::LockPoisoned`] if the lock was poisoned.
    ///
    /// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        // Read under the lock: a reading taken before it could be older than
        // the tick the previous holder just committed.
        let now = self.time.current_millis();

        match state.advance(now, &self.layout, &self.seed)? {
            Step::Issue(next) => {
                *state = next;
                Ok(Poll::Ready {
                    id: self
                        .layout
                        .pack(next.last_timestamp, self.identity, next.sequence),
                })
            }
            Step::Exhausted => Ok(Poll::Pending { yield_for: 1 }),
        }
    }
}

impl<T, R> IdAllocator for LockGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    fn layout(&self) -> &BitLayout {
        &self.layout
    }

    fn identity(&self) -> Identity {
        self.identity
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}
