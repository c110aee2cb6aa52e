use core::fmt;

use crate::BitLayout;

/// The fields recovered from an identifier by [`decode`].
///
/// `timestamp` is absolute: ticks of the layout's resolution since the UNIX
/// epoch, with the layout epoch already added back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DecodedId {
    pub timestamp: u64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

impl fmt::Display for DecodedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp={} datacenter={} worker={} sequence={}",
            self.timestamp, self.datacenter_id, self.worker_id, self.sequence
        )
    }
}

impl BitLayout {
    /// Splits `id` back into its fields.
    ///
    /// This is the inverse of the packing done by the allocators. Decoding
    /// with a layout other than the one the id was allocated under yields
    /// garbage; that is the caller's contract and is not checked.
    pub const fn decode(&self, id: i64) -> DecodedId {
        let raw = id as u64;
        DecodedId {
            timestamp: (raw >> self.timestamp_shift()).wrapping_add(self.epoch()),
            datacenter_id: (raw >> self.datacenter_shift()) & self.max_datacenter_id(),
            worker_id: (raw >> self.worker_shift()) & self.max_worker_id(),
            sequence: raw & self.max_sequence(),
        }
    }
}

/// Decodes `id` under `layout`. See [`BitLayout::decode`].
///
/// # Example
/// ```
/// use keyflake::{decode, BitLayout, DecodedId, Resolution};
///
/// let layout = BitLayout::new(41, 5, 5, 12, 0, Resolution::Millisecond).unwrap();
/// let id = (1_234_i64 << 22) | (7 << 17) | (3 << 12);
/// assert_eq!(
///     decode(id, &layout),
///     DecodedId { timestamp: 1_234, datacenter_id: 7, worker_id: 3, sequence: 0 }
/// );
/// ```
pub const fn decode(id: i64, layout: &BitLayout) -> DecodedId {
    layout.decode(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolution;

    #[test]
    fn decodes_reference_example() {
        let layout = BitLayout::new(41, 5, 5, 12, 0, Resolution::Millisecond).unwrap();
        let t = 1_700_000_000_000;
        let id = layout.compose(t, 7, 3, 0).unwrap();
        assert_eq!(
            decode(id, &layout),
            DecodedId {
                timestamp: t,
                datacenter_id: 7,
                worker_id: 3,
                sequence: 0,
            }
        );
    }

    #[test]
    fn round_trips_field_boundaries() {
        let layouts = [
            BitLayout::standard(Resolution::Millisecond, 1_288_834_974_657),
            BitLayout::standard(Resolution::Second, 1_288_834_974),
            BitLayout::new(40, 3, 7, 10, 42, Resolution::Millisecond).unwrap(),
            BitLayout::new(51, 0, 0, 12, 0, Resolution::Millisecond).unwrap(),
        ];

        for layout in layouts {
            let samples = [
                (0, 0, 0, 0),
                (
                    layout.max_timestamp(),
                    layout.max_datacenter_id(),
                    layout.max_worker_id(),
                    layout.max_sequence(),
                ),
                (
                    layout.max_timestamp() / 2,
                    layout.max_datacenter_id() / 2,
                    layout.max_worker_id(),
                    1,
                ),
            ];
            for (elapsed, datacenter_id, worker_id, sequence) in samples {
                let timestamp = layout.epoch() + elapsed;
                let id = layout
                    .compose(timestamp, datacenter_id, worker_id, sequence)
                    .unwrap();
                assert!(id >= 0, "sign bit set for {layout}");
                assert_eq!(
                    layout.decode(id),
                    DecodedId {
                        timestamp,
                        datacenter_id,
                        worker_id,
                        sequence,
                    },
                    "layout {layout}"
                );
            }
        }
    }

    #[test]
    fn ordering_follows_timestamp_then_sequence() {
        let layout = BitLayout::standard(Resolution::Millisecond, 0);
        let a = layout.compose(10, 31, 31, 4095).unwrap();
        let b = layout.compose(11, 0, 0, 0).unwrap();
        let c = layout.compose(11, 0, 0, 1).unwrap();
        assert!(a < b && b < c);
    }
}
