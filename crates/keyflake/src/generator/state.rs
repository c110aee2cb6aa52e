use core::cmp::Ordering;

use crate::{BitLayout, Error, RandSource, Result, ThreadRandom};

/// Default upper bound for the randomized starting sequence of a new tick.
pub const DEFAULT_RANDOM_SEQUENCE_LIMIT: u64 = 8;

/// The mutable part of an allocator: the tick it last issued an id for and
/// the sequence used within that tick.
///
/// `last_timestamp` is measured in ticks since the layout epoch, the same
/// quantity stored in the timestamp field of an id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AllocatorState {
    pub last_timestamp: u64,
    pub sequence: u64,
}

/// What the allocator should do after observing the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Commit this state and issue the id it describes.
    Issue(AllocatorState),
    /// Every sequence of the current tick is spent; wait for the next tick.
    Exhausted,
}

impl AllocatorState {
    pub const fn new(last_timestamp: u64, sequence: u64) -> Self {
        Self {
            last_timestamp,
            sequence,
        }
    }

    /// Recovers the state from the last id issued under `layout`.
    pub(crate) const fn from_id(raw: u64, layout: &BitLayout) -> Self {
        Self {
            last_timestamp: raw >> layout.timestamp_shift(),
            sequence: raw & layout.max_sequence(),
        }
    }

    /// Computes the successor state for a clock reading of `now_millis`.
    #[inline]
    pub(crate) fn advance<R: RandSource>(
        self,
        now_millis: u64,
        layout: &BitLayout,
        seed: &SequenceSeed<R>,
    ) -> Result<Step> {
        let Some(now) = layout.elapsed_ticks(now_millis) else {
            // The reading predates the epoch, which is behind every tick this
            // allocator could have issued.
            let drift = (self.last_timestamp + layout.epoch())
                .saturating_sub(layout.resolution().ticks_from_millis(now_millis));
            return Err(cold_clock_behind(drift));
        };

        match now.cmp(&self.last_timestamp) {
            Ordering::Equal => {
                if self.sequence < layout.max_sequence() {
                    Ok(Step::Issue(Self::new(now, self.sequence + 1)))
                } else {
                    Ok(Step::Exhausted)
                }
            }
            Ordering::Greater => {
                if now > layout.max_timestamp() {
                    return Err(Error::TimestampOverflow {
                        timestamp: now,
                        max: layout.max_timestamp(),
                    });
                }
                Ok(Step::Issue(Self::new(
                    now,
                    seed.start(layout.max_sequence()),
                )))
            }
            Ordering::Less => Err(cold_clock_behind(self.last_timestamp - now)),
        }
    }
}

#[cold]
#[inline(never)]
fn cold_clock_behind(drift: u64) -> Error {
    #[cfg(feature = "tracing")]
    tracing::error!(drift, "clock moved backwards; refusing to allocate");
    Error::ClockRolledBack { drift }
}

/// Picks the sequence an allocator starts from when the clock enters a new
/// tick.
///
/// Starting at a small random non-zero value instead of zero makes it less
/// likely that two allocators sharing an identity (typically the same process
/// restarted within one tick) hand out the same id. It lowers that risk; it
/// does not remove it. A `limit` of zero disables the jitter and every tick
/// starts at sequence zero.
#[derive(Clone, Debug)]
pub struct SequenceSeed<R = ThreadRandom> {
    rng: R,
    limit: u64,
}

impl Default for SequenceSeed<ThreadRandom> {
    fn default() -> Self {
        Self::new(DEFAULT_RANDOM_SEQUENCE_LIMIT)
    }
}

impl SequenceSeed<ThreadRandom> {
    /// Randomizes the starting sequence within `[1, limit]` using the
    /// thread-local RNG.
    pub const fn new(limit: u64) -> Self {
        Self::with_rand(ThreadRandom, limit)
    }

    /// Every tick starts at sequence zero.
    pub const fn disabled() -> Self {
        Self::new(0)
    }
}

impl<R> SequenceSeed<R> {
    pub const fn with_rand(rng: R, limit: u64) -> Self {
        Self { rng, limit }
    }

    pub const fn limit(&self) -> u64 {
        self.limit
    }
}

impl<R: RandSource> SequenceSeed<R> {
    /// A starting sequence in `[1, min(limit, max_sequence)]`, or `0` when
    /// that range is empty.
    pub(crate) fn start(&self, max_sequence: u64) -> u64 {
        let bound = self.limit.min(max_sequence);
        if bound == 0 {
            return 0;
        }
        1 + self.rng.rand() % bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolution;

    struct FixedRand(u64);
    impl RandSource for FixedRand {
        fn rand(&self) -> u64 {
            self.0
        }
    }

    fn layout() -> BitLayout {
        BitLayout::new(41, 5, 5, 2, 1_000, Resolution::Millisecond).unwrap()
    }

    #[test]
    fn same_tick_increments_until_exhausted() {
        let seed = SequenceSeed::disabled();
        let layout = layout();
        let mut state = AllocatorState::new(5, 0);
        for expected in 1..=3 {
            match state.advance(1_005, &layout, &seed).unwrap() {
                Step::Issue(next) => {
                    assert_eq!(next, AllocatorState::new(5, expected));
                    state = next;
                }
                Step::Exhausted => panic!("exhausted early at {expected}"),
            }
        }
        assert_eq!(
            state.advance(1_005, &layout, &seed).unwrap(),
            Step::Exhausted
        );
    }

    #[test]
    fn new_tick_resets_sequence() {
        let state = AllocatorState::new(5, 3);
        let step = state
            .advance(1_009, &layout(), &SequenceSeed::disabled())
            .unwrap();
        assert_eq!(step, Step::Issue(AllocatorState::new(9, 0)));
    }

    #[test]
    fn new_tick_applies_jitter_within_bounds() {
        let layout = BitLayout::new(41, 5, 5, 12, 0, Resolution::Millisecond).unwrap();
        for raw in [0, 1, 7, 8, 9, u64::MAX] {
            let seed = SequenceSeed::with_rand(FixedRand(raw), 8);
            match AllocatorState::default().advance(10, &layout, &seed).unwrap() {
                Step::Issue(next) => {
                    assert!((1..=8).contains(&next.sequence), "raw {raw}");
                    assert_eq!(next.sequence, 1 + raw % 8);
                }
                Step::Exhausted => panic!("fresh tick cannot be exhausted"),
            }
        }
    }

    #[test]
    fn jitter_is_capped_by_max_sequence() {
        let seed = SequenceSeed::with_rand(FixedRand(u64::MAX), 1_000);
        assert!(seed.start(3) <= 3);
        assert_eq!(seed.start(0), 0);
    }

    #[test]
    fn earlier_tick_is_a_rollback() {
        let err = AllocatorState::new(9, 0)
            .advance(1_004, &layout(), &SequenceSeed::disabled())
            .unwrap_err();
        assert_eq!(err, Error::ClockRolledBack { drift: 5 });
    }

    #[test]
    fn reading_before_epoch_is_a_rollback() {
        let err = AllocatorState::new(2, 0)
            .advance(990, &layout(), &SequenceSeed::disabled())
            .unwrap_err();
        assert_eq!(err, Error::ClockRolledBack { drift: 12 });
    }

    #[test]
    fn timestamp_overflow_is_reported() {
        let layout = BitLayout::new(4, 0, 0, 4, 0, Resolution::Millisecond).unwrap();
        let err = AllocatorState::default()
            .advance(16, &layout, &SequenceSeed::disabled())
            .unwrap_err();
        assert_eq!(
            err,
            Error::TimestampOverflow {
                timestamp: 16,
                max: 15
            }
        );
    }

    #[test]
    fn state_round_trips_through_packed_id() {
        let layout = BitLayout::standard(Resolution::Millisecond, 0);
        let identity = crate::Identity::new(31, 17, &layout).unwrap();
        let id = layout.pack(123_456, identity, 789);
        assert_eq!(
            AllocatorState::from_id(id as u64, &layout),
            AllocatorState::new(123_456, 789)
        );
    }
}
