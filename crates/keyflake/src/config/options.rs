use core::{fmt, str::FromStr};

use crate::{DEFAULT_RANDOM_SEQUENCE_LIMIT, Error, Resolution};

/// Capacity used by the cached strategy when none is configured.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Where the worker/datacenter identity comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IdentitySource {
    /// `worker_id` and `datacenter_id` must both be set.
    Specified,
    /// Hashed from the host identifier.
    #[default]
    Hardware,
    /// Fixed well-known layout plus hardware-derived identity.
    Default,
}

/// Which allocator implementation to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConcurrencyStrategy {
    /// [`LockGenerator`](crate::LockGenerator)
    #[default]
    Sync,
    /// [`AtomicGenerator`](crate::AtomicGenerator)
    LockFree,
    /// [`CachedGenerator`](crate::CachedGenerator)
    Cached,
}

/// The recognized configuration options.
///
/// Bit widths and ids are signed because that is how host configuration
/// surfaces hand them over; [`configure`] rejects negative values. With the
/// `serde` feature the field names deserialize in camelCase
/// (`timestampBits`, `epochTimestamp`, ...) and every field is optional.
///
/// [`configure`]: crate::configure
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct GeneratorOptions {
    pub timestamp_bits: i32,
    pub datacenter_bits: i32,
    pub worker_bits: i32,
    pub sequence_bits: i32,
    /// Zero point of the timestamp field in ticks of `resolution` since the
    /// UNIX epoch. Defaults to the Twitter epoch.
    pub epoch_timestamp: Option<i64>,
    pub resolution: Resolution,
    pub identity_strategy: IdentitySource,
    pub worker_id: Option<i64>,
    pub datacenter_id: Option<i64>,
    pub concurrency_strategy: ConcurrencyStrategy,
    /// Queue capacity for [`ConcurrencyStrategy::Cached`]. Defaults to
    /// [`DEFAULT_CACHE_SIZE`].
    pub cache_size: Option<usize>,
    /// Upper bound of the random starting sequence of each tick; `0`
    /// disables it.
    pub random_sequence_limit: u64,
    /// Whether hardware-derived identity may fall back to a random value
    /// when the host exposes no identifier.
    pub random_identity_fallback: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            timestamp_bits: 41,
            datacenter_bits: 5,
            worker_bits: 5,
            sequence_bits: 12,
            epoch_timestamp: None,
            resolution: Resolution::Millisecond,
            identity_strategy: IdentitySource::Hardware,
            worker_id: None,
            datacenter_id: None,
            concurrency_strategy: ConcurrencyStrategy::Sync,
            cache_size: None,
            random_sequence_limit: DEFAULT_RANDOM_SEQUENCE_LIMIT,
            random_identity_fallback: true,
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ms" | "millis" | "millisecond" => Ok(Self::Millisecond),
            "s" | "secs" | "second" => Ok(Self::Second),
            other => Err(Error::config(format!("unknown resolution `{other}`"))),
        }
    }
}

impl FromStr for IdentitySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "specified" => Ok(Self::Specified),
            "hardware" => Ok(Self::Hardware),
            "default" => Ok(Self::Default),
            other => Err(Error::config(format!("unknown identity strategy `{other}`"))),
        }
    }
}

impl FromStr for ConcurrencyStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "lockfree" | "lock-free" => Ok(Self::LockFree),
            "cached" => Ok(Self::Cached),
            other => Err(Error::config(format!(
                "unknown concurrency strategy `{other}`"
            ))),
        }
    }
}

impl fmt::Display for ConcurrencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync => "sync",
            Self::LockFree => "lockfree",
            Self::Cached => "cached",
        })
    }
}
