/// The outcome of a single, non-blocking allocation attempt.
///
/// - [`Poll::Ready`] carries a freshly issued id.
/// - [`Poll::Pending`] means nothing was issued: either the current tick's
///   sequence space is spent (`yield_for` is one tick) or, for the lock-free
///   allocator, another thread won the race (`yield_for` is zero and the
///   attempt can be retried at once).
///
/// [`IdAllocator::next_id`] loops over this for you; poll directly only when
/// you want to control the waiting yourself.
///
/// # Example
///
/// ```
/// use keyflake::{BitLayout, IdAllocator, Identity, LockGenerator, Poll, Resolution, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let layout = BitLayout::standard(Resolution::Millisecond, 0);
/// let generator = LockGenerator::new(layout, Identity::default(), FixedTime);
/// match generator.try_poll_id().unwrap() {
///     Poll::Ready { id } => println!("id: {id}"),
///     Poll::Pending { yield_for } => println!("back off for {yield_for} tick(s)"),
/// }
/// ```
///
/// [`IdAllocator::next_id`]: crate::IdAllocator::next_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique id was issued.
    Ready {
        /// The issued id.
        id: i64,
    },
    /// No id could be issued yet.
    Pending {
        /// Ticks to wait before the next attempt can succeed.
        yield_for: u64,
    },
}
