/// A source of random 64-bit integers.
///
/// Allocators use it to pick the starting sequence of each new tick, and
/// hardware-derived identity falls back to it when the host has no
/// identifier. Plug in a fixed source to make either deterministic in tests.
///
/// # Example
/// ```
/// use keyflake::RandSource;
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn rand(&self) -> u64 {
///         1234
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), 1234);
/// ```
pub trait RandSource {
    /// Returns a random integer.
    fn rand(&self) -> u64;
}

impl<R: RandSource + ?Sized> RandSource for &R {
    fn rand(&self) -> u64 {
        (**self).rand()
    }
}
