use core::{fmt, time::Duration};

use crate::{Error, Identity, Result};

/// Total number of bits a layout may spend. The remaining (64th) bit is the
/// sign bit of the `i64` identifier and always stays clear.
pub const MAX_LAYOUT_BITS: u32 = 63;

/// Clock resolution of the timestamp field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Resolution {
    /// One tick per millisecond.
    #[default]
    Millisecond,
    /// One tick per second.
    Second,
}

impl Resolution {
    /// Converts milliseconds since the UNIX epoch into ticks.
    pub const fn ticks_from_millis(self, millis: u64) -> u64 {
        match self {
            Self::Millisecond => millis,
            Self::Second => millis / 1_000,
        }
    }

    /// Converts a duration since the UNIX epoch into ticks.
    pub const fn ticks_from_duration(self, duration: Duration) -> u64 {
        match self {
            Self::Millisecond => duration.as_millis() as u64,
            Self::Second => duration.as_secs(),
        }
    }

    /// Wall-clock length of one tick.
    pub const fn tick(self) -> Duration {
        match self {
            Self::Millisecond => Duration::from_millis(1),
            Self::Second => Duration::from_secs(1),
        }
    }

    /// Short unit suffix used when rendering timestamps.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Millisecond => "ms",
            Self::Second => "s",
        }
    }
}

/// The bit-field layout of a generated identifier.
///
/// From the most significant (non-sign) bit down:
///
/// ```text
/// | timestamp | datacenter | worker | sequence |
/// ```
///
/// A layout is built once at start-up and never mutated. The shift amounts
/// and field maxima are derived in the constructor so that the allocation
/// and decoding hot paths only do masking and shifting.
///
/// # Example
/// ```
/// use keyflake::{BitLayout, Resolution};
///
/// let layout = BitLayout::new(41, 5, 5, 12, 0, Resolution::Millisecond).unwrap();
/// assert_eq!(layout.max_sequence(), 4095);
/// assert_eq!(layout.worker_shift(), 12);
/// assert_eq!(layout.datacenter_shift(), 17);
/// assert_eq!(layout.timestamp_shift(), 22);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitLayout {
    timestamp_bits: u8,
    datacenter_bits: u8,
    worker_bits: u8,
    sequence_bits: u8,
    epoch: u64,
    resolution: Resolution,

    max_timestamp: u64,
    max_datacenter_id: u64,
    max_worker_id: u64,
    max_sequence: u64,

    worker_shift: u32,
    datacenter_shift: u32,
    timestamp_shift: u32,
}

impl BitLayout {
    /// Creates a layout from explicit field widths.
    ///
    /// `epoch` is the zero point of the timestamp field, expressed in ticks
    /// of `resolution` since the UNIX epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the widths add up to more than
    /// [`MAX_LAYOUT_BITS`].
    pub fn new(
        timestamp_bits: u8,
        datacenter_bits: u8,
        worker_bits: u8,
        sequence_bits: u8,
        epoch: u64,
        resolution: Resolution,
    ) -> Result<Self> {
        let total = u32::from(timestamp_bits)
            + u32::from(datacenter_bits)
            + u32::from(worker_bits)
            + u32::from(sequence_bits);
        if total > MAX_LAYOUT_BITS {
            return Err(Error::config(format!(
                "bit widths {timestamp_bits}/{datacenter_bits}/{worker_bits}/{sequence_bits} \
                 sum to {total}, more than the {MAX_LAYOUT_BITS} available"
            )));
        }

        Ok(Self::from_widths(
            timestamp_bits,
            datacenter_bits,
            worker_bits,
            sequence_bits,
            epoch,
            resolution,
        ))
    }

    /// The well-known layout used by the default identity strategy.
    ///
    /// - millisecond resolution: 41 / 5 / 5 / 12
    /// - second resolution: 34 / 8 / 8 / 13
    pub const fn standard(resolution: Resolution, epoch: u64) -> Self {
        match resolution {
            Resolution::Millisecond => Self::from_widths(41, 5, 5, 12, epoch, resolution),
            Resolution::Second => Self::from_widths(34, 8, 8, 13, epoch, resolution),
        }
    }

    // Callers guarantee the widths sum to at most 63.
    const fn from_widths(
        timestamp_bits: u8,
        datacenter_bits: u8,
        worker_bits: u8,
        sequence_bits: u8,
        epoch: u64,
        resolution: Resolution,
    ) -> Self {
        let worker_shift = sequence_bits as u32;
        let datacenter_shift = worker_shift + worker_bits as u32;
        let timestamp_shift = datacenter_shift + datacenter_bits as u32;
        Self {
            timestamp_bits,
            datacenter_bits,
            worker_bits,
            sequence_bits,
            epoch,
            resolution,
            max_timestamp: mask(timestamp_bits),
            max_datacenter_id: mask(datacenter_bits),
            max_worker_id: mask(worker_bits),
            max_sequence: mask(sequence_bits),
            worker_shift,
            datacenter_shift,
            timestamp_shift,
        }
    }

    pub const fn timestamp_bits(&self) -> u8 {
        self.timestamp_bits
    }

    pub const fn datacenter_bits(&self) -> u8 {
        self.datacenter_bits
    }

    pub const fn worker_bits(&self) -> u8 {
        self.worker_bits
    }

    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// Zero point of the timestamp field, in ticks since the UNIX epoch.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Largest number of ticks since the epoch the timestamp field can hold.
    pub const fn max_timestamp(&self) -> u64 {
        self.max_timestamp
    }

    pub const fn max_datacenter_id(&self) -> u64 {
        self.max_datacenter_id
    }

    pub const fn max_worker_id(&self) -> u64 {
        self.max_worker_id
    }

    /// `2^sequence_bits - 1`: the last sequence value usable within a tick.
    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    pub const fn worker_shift(&self) -> u32 {
        self.worker_shift
    }

    pub const fn datacenter_shift(&self) -> u32 {
        self.datacenter_shift
    }

    pub const fn timestamp_shift(&self) -> u32 {
        self.timestamp_shift
    }

    /// Converts a wall-clock reading (milliseconds since the UNIX epoch) into
    /// ticks elapsed since this layout's epoch, or `None` if the reading lies
    /// before the epoch.
    pub const fn elapsed_ticks(&self, unix_millis: u64) -> Option<u64> {
        self.resolution
            .ticks_from_millis(unix_millis)
            .checked_sub(self.epoch)
    }

    /// Packs already-validated fields into an identifier.
    ///
    /// `elapsed` is measured from the epoch. Identity fields are masked so a
    /// mismatched identity can never bleed into a neighbouring field.
    #[inline]
    pub(crate) const fn pack(&self, elapsed: u64, identity: Identity, sequence: u64) -> i64 {
        let raw = (elapsed << self.timestamp_shift)
            | ((identity.datacenter_id() & self.max_datacenter_id) << self.datacenter_shift)
            | ((identity.worker_id() & self.max_worker_id) << self.worker_shift)
            | (sequence & self.max_sequence);
        raw as i64
    }

    /// Builds an identifier from its components, checking every field.
    ///
    /// `timestamp` is absolute (ticks since the UNIX epoch), mirroring what
    /// [`BitLayout::decode`] returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentOutOfRange`] if any component does not fit
    /// its field or the timestamp precedes the epoch.
    ///
    /// # Example
    /// ```
    /// use keyflake::{BitLayout, Resolution};
    ///
    /// let layout = BitLayout::standard(Resolution::Millisecond, 0);
    /// let id = layout.compose(1_000, 7, 3, 0).unwrap();
    /// let decoded = layout.decode(id);
    /// assert_eq!(decoded.timestamp, 1_000);
    /// assert_eq!(decoded.datacenter_id, 7);
    /// assert_eq!(decoded.worker_id, 3);
    /// ```
    pub fn compose(
        &self,
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Result<i64> {
        let elapsed = timestamp
            .checked_sub(self.epoch)
            .ok_or(Error::ComponentOutOfRange {
                component: "timestamp",
                value: timestamp,
                max: self.epoch.saturating_add(self.max_timestamp),
            })?;
        check("timestamp", elapsed, self.max_timestamp)?;
        check("datacenter_id", datacenter_id, self.max_datacenter_id)?;
        check("worker_id", worker_id, self.max_worker_id)?;
        check("sequence", sequence, self.max_sequence)?;

        let identity = Identity::new_unchecked(worker_id, datacenter_id);
        Ok(self.pack(elapsed, identity, sequence))
    }
}

impl fmt::Display for BitLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{} @ {} (epoch {})",
            self.timestamp_bits,
            self.datacenter_bits,
            self.worker_bits,
            self.sequence_bits,
            self.resolution.unit(),
            self.epoch
        )
    }
}

const fn mask(bits: u8) -> u64 {
    (1_u64 << bits) - 1
}

fn check(component: &'static str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::ComponentOutOfRange {
            component,
            value,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_shifts_and_maxima() {
        let layout = BitLayout::new(41, 5, 5, 12, 0, Resolution::Millisecond).unwrap();
        assert_eq!(layout.max_timestamp(), (1 << 41) - 1);
        assert_eq!(layout.max_datacenter_id(), 31);
        assert_eq!(layout.max_worker_id(), 31);
        assert_eq!(layout.max_sequence(), 4095);
        assert_eq!(layout.worker_shift(), 12);
        assert_eq!(layout.datacenter_shift(), 17);
        assert_eq!(layout.timestamp_shift(), 22);
    }

    #[test]
    fn rejects_widths_over_63_bits() {
        let err = BitLayout::new(50, 10, 10, 10, 0, Resolution::Millisecond).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn accepts_exactly_63_bits_and_zero_width_fields() {
        let layout = BitLayout::new(51, 0, 0, 12, 0, Resolution::Millisecond).unwrap();
        assert_eq!(layout.max_datacenter_id(), 0);
        assert_eq!(layout.max_worker_id(), 0);
        assert_eq!(layout.timestamp_shift(), 12);
    }

    #[test]
    fn standard_layouts_use_all_63_bits() {
        for resolution in [Resolution::Millisecond, Resolution::Second] {
            let layout = BitLayout::standard(resolution, 0);
            let total = u32::from(layout.timestamp_bits())
                + u32::from(layout.datacenter_bits())
                + u32::from(layout.worker_bits())
                + u32::from(layout.sequence_bits());
            assert_eq!(total, MAX_LAYOUT_BITS);
        }
        let second = BitLayout::standard(Resolution::Second, 0);
        assert_eq!(second.timestamp_bits(), 34);
        assert_eq!(second.sequence_bits(), 13);
    }

    #[test]
    fn max_values_never_touch_the_sign_bit() {
        let layout = BitLayout::standard(Resolution::Millisecond, 0);
        let id = layout
            .compose(
                layout.max_timestamp(),
                layout.max_datacenter_id(),
                layout.max_worker_id(),
                layout.max_sequence(),
            )
            .unwrap();
        assert_eq!(id, i64::MAX);
    }

    #[test]
    fn compose_rejects_out_of_range_components() {
        let layout = BitLayout::new(41, 5, 5, 12, 100, Resolution::Millisecond).unwrap();
        assert!(matches!(
            layout.compose(99, 0, 0, 0),
            Err(Error::ComponentOutOfRange {
                component: "timestamp",
                ..
            })
        ));
        assert!(matches!(
            layout.compose(100, 32, 0, 0),
            Err(Error::ComponentOutOfRange {
                component: "datacenter_id",
                ..
            })
        ));
        assert!(matches!(
            layout.compose(100, 0, 32, 0),
            Err(Error::ComponentOutOfRange {
                component: "worker_id",
                ..
            })
        ));
        assert!(matches!(
            layout.compose(100, 0, 0, 4096),
            Err(Error::ComponentOutOfRange {
                component: "sequence",
                ..
            })
        ));
    }

    #[test]
    fn elapsed_ticks_respects_resolution() {
        let ms = BitLayout::standard(Resolution::Millisecond, 1_000);
        assert_eq!(ms.elapsed_ticks(1_500), Some(500));
        assert_eq!(ms.elapsed_ticks(999), None);

        let s = BitLayout::standard(Resolution::Second, 10);
        assert_eq!(s.elapsed_ticks(12_999), Some(2));
        assert_eq!(s.elapsed_ticks(9_999), None);
    }
}
