use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BitLayout, IdAllocator, Identity, Poll, RandSource, Result, ThreadRandom, TimeSource,
    generator::{AllocatorState, SequenceSeed, Step},
};

/// A lock-free allocator suitable for multi-threaded environments.
///
/// The allocator state lives in a single [`AtomicU64`] holding the last id
/// issued. Because the identity bits never change, that one word is enough to
/// recover the `(last_timestamp, sequence)` pair. Each attempt loads it,
/// computes the successor and publishes it with a compare-and-swap; losing
/// the race reports [`Poll::Pending`] with `yield_for == 0` so the caller can
/// retry at once.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Never blocks on a lock
/// - ❌ Fair access: under heavy contention an unlucky thread may retry
///   repeatedly
///
/// ## See Also
/// - [`LockGenerator`]
/// - [`CachedGenerator`]
///
/// [`LockGenerator`]: crate::LockGenerator
/// [`CachedGenerator`]: crate::CachedGenerator
pub struct AtomicGenerator<T, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    layout: BitLayout,
    identity: Identity,
    time: T,
    seed: SequenceSeed<R>,
}

impl<T> AtomicGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`AtomicGenerator`] with the default sequence jitter.
    ///
    /// # Example
    /// ```
    /// use keyflake::{AtomicGenerator, BitLayout, IdAllocator, Identity, MonotonicClock, Resolution};
    ///
    /// let layout = BitLayout::standard(Resolution::Millisecond, 0);
    /// let generator = AtomicGenerator::new(layout, Identity::default(), MonotonicClock::new());
    ///
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(b > a);
    /// ```
    pub fn new(layout: BitLayout, identity: Identity, time: T) -> Self {
        Self::with_seed(layout, identity, time, SequenceSeed::default())
    }
}

impl<T, R> AtomicGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Creates a new [`AtomicGenerator`] with an explicit sequence seed.
    pub fn with_seed(layout: BitLayout, identity: Identity, time: T, seed: SequenceSeed<R>) -> Self {
        Self::from_state(layout, identity, AllocatorState::default(), time, seed)
    }

    /// Creates a generator preloaded with `state`.
    ///
    /// `state.last_timestamp` must fit the layout's timestamp field and
    /// `state.sequence` its sequence field.
    pub fn from_state(
        layout: BitLayout,
        identity: Identity,
        state: AllocatorState,
        time: T,
        seed: SequenceSeed<R>,
    ) -> Self {
        let initial = layout.pack(state.last_timestamp, identity, state.sequence) as u64;
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(initial)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(initial),
            layout,
            identity,
            time,
            seed,
        }
    }

    /// Attempts to issue the next id without waiting.
    ///
    /// Returns [`Poll::Pending`] with `yield_for == 0` when another thread
    /// won the compare-and-swap, and with `yield_for == 1` when the current
    /// tick is exhausted.
    ///
    /// # Errors
    /// - [`Error::ClockRolledBack`] if the clock is behind the last issued
    ///   tick.
    /// - [`Error::TimestampOverflow`] if the timestamp field is exhausted.
    ///
    /// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        // Acquire pairs with the AcqRel exchange below so the clock is read
        // after the tick that produced `current_raw`.
        let current_raw = self.state.load(Ordering::Acquire);
        let current = AllocatorState::from_id(current_raw, &self.layout);
        let now = self.time.current_millis();

        let next = match current.advance(now, &self.layout, &self.seed)? {
            Step::Issue(next) => next,
            Step::Exhausted => return Ok(Poll::Pending { yield_for: 1 }),
        };

        let id = self
            .layout
            .pack(next.last_timestamp, self.identity, next.sequence);

        if self
            .state
            .compare_exchange(current_raw, id as u64, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(Poll::Ready { id })
        } else {
            // CAS failed - another thread won the race. Yield 0 to retry
            // immediately.
            Ok(Poll::Pending { yield_for: 0 })
        }
    }
}

impl<T, R> IdAllocator for AtomicGenerator<T, R>
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
