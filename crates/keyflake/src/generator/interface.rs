use crate::{BitLayout, DecodedId, Identity, Poll, Result};

/// The contract shared by every allocation strategy.
///
/// Implementations hand out ids that are unique for their
/// `(layout, identity)` pair and non-decreasing across sequential calls as
/// long as the clock does not move backwards. A clock that does move
/// backwards makes the call fail with [`Error::ClockRolledBack`]; the
/// allocator never waits that out on its own.
///
/// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
pub trait IdAllocator {
    /// The layout ids are packed with.
    fn layout(&self) -> &BitLayout;

    /// The identity stamped into every id.
    fn identity(&self) -> Identity;

    /// Attempts to issue an id without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRolledBack`] if the clock is behind the last issued
    ///   tick.
    /// - [`Error::TimestampOverflow`] once the layout's timestamp field is
    ///   exhausted.
    /// - [`Error::LockPoisoned`] for lock-based strategies whose lock was
    ///   poisoned.
    ///
    /// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    fn try_poll_id(&self) -> Result<Poll>;

    /// Issues the next id, waiting for the clock to advance if the current
    /// tick's sequence space is exhausted.
    ///
    /// The wait is bounded by one tick of the layout's resolution.
    ///
    /// # Errors
    ///
    /// Same as [`IdAllocator::try_poll_id`].
    fn next_id(&self) -> Result<i64> {
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => backoff(yield_for),
            }
        }
    }

    /// [`IdAllocator::next_id`] rendered as a decimal string, for callers
    /// that key entities by string.
    ///
    /// # Errors
    ///
    /// Same as [`IdAllocator::try_poll_id`].
    fn next_id_string(&self) -> Result<String> {
        self.next_id().map(|id| id.to_string())
    }

    /// Decodes `id` with this allocator's layout.
    fn decode(&self, id: i64) -> DecodedId {
        self.layout().decode(id)
    }
}

impl<A: IdAllocator + ?Sized> IdAllocator for &A {
    fn layout(&self) -> &BitLayout {
        (**self).layout()
    }

    fn identity(&self) -> Identity {
        (**self).identity()
    }

    fn try_poll_id(&self) -> Result<Poll> {
        (**self).try_poll_id()
    }
}

impl<A: IdAllocator + ?Sized> IdAllocator for std::sync::Arc<A> {
    fn layout(&self) -> &BitLayout {
        (**self).layout()
    }

    fn identity(&self) -> Identity {
        (**self).identity()
    }

    fn try_poll_id(&self) -> Result<Poll> {
        (**self).try_poll_id()
    }
}

/// Waits out a [`Poll::Pending`]: spin for a lost race, yield the thread for
/// an exhausted tick.
#[inline]
pub(crate) fn backoff(yield_for: u64) {
    if yield_for == 0 {
        core::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}
