use crate::{
    AtomicGenerator, BitLayout, CachedGenerator, ConcurrencyStrategy, IdAllocator, Identity,
    LockGenerator, Poll, RandSource, Result, SystemClock, ThreadRandom, TimeSource,
};

/// Whichever allocation strategy configuration selected.
///
/// Built by [`Config::build`]; callers that know their strategy at compile
/// time can use the concrete generators directly instead.
///
/// [`Config::build`]: crate::Config::build
pub enum Generator<T = SystemClock, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    Lock(LockGenerator<T, R>),
    Atomic(AtomicGenerator<T, R>),
    Cached(CachedGenerator<T, R>),
}

impl<T, R> Generator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    pub const fn strategy(&self) -> ConcurrencyStrategy {
        match self {
            Self::Lock(_) => ConcurrencyStrategy::Sync,
            Self::Atomic(_) => ConcurrencyStrategy::LockFree,
            Self::Cached(_) => ConcurrencyStrategy::Cached,
        }
    }
}

impl<T, R> IdAllocator for Generator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    fn layout(&self) -> &BitLayout {
        match self {
            Self::Lock(generator) => generator.layout(),
            Self::Atomic(generator) => generator.layout(),
            Self::Cached(generator) => generator.layout(),
        }
    }

    fn identity(&self) -> Identity {
        match self {
            Self::Lock(generator) => generator.identity(),
            Self::Atomic(generator) => generator.identity(),
            Self::Cached(generator) => generator.identity(),
        }
    }

    #[inline]
    fn try_poll_id(&self) -> Result<Poll> {
        match self {
            Self::Lock(generator) => generator.try_poll_id(),
            Self::Atomic(generator) => generator.try_poll_id(),
            Self::Cached(generator) => generator.try_poll_id(),
        }
    }
}

impl<T: TimeSource, R: RandSource> From<LockGenerator<T, R>> for Generator<T, R> {
    fn from(generator: LockGenerator<T, R>) -> Self {
        Self::Lock(generator)
    }
}

impl<T: TimeSource, R: RandSource> From<AtomicGenerator<T, R>> for Generator<T, R> {
    fn from(generator: AtomicGenerator<T, R>) -> Self {
        Self::Atomic(generator)
    }
}

impl<T: TimeSource, R: RandSource> From<CachedGenerator<T, R>> for Generator<T, R> {
    fn from(generator: CachedGenerator<T, R>) -> Self {
        Self::Cached(generator)
    }
}
