use std::{env, fs};

/// A source of bytes identifying the current host.
///
/// Hardware-derived identity hashes whatever this returns into the worker and
/// datacenter fields. Implementations should be stable for the lifetime of a
/// host (or container) and distinct across hosts; they do not need to be
/// secret.
///
/// # Example
/// ```
/// use keyflake::HostIdentifier;
///
/// struct PodName;
/// impl HostIdentifier for PodName {
///     fn host_identifier(&self) -> Option<Vec<u8>> {
///         Some(b"orders-7d9f8".to_vec())
///     }
/// }
///
/// assert!(PodName.host_identifier().is_some());
/// ```
pub trait HostIdentifier {
    /// Returns the host's identifying bytes, or `None` if nothing usable is
    /// available.
    fn host_identifier(&self) -> Option<Vec<u8>>;
}

impl<H: HostIdentifier + ?Sized> HostIdentifier for &H {
    fn host_identifier(&self) -> Option<Vec<u8>> {
        (**self).host_identifier()
    }
}

/// Reads the host identity from the operating system.
///
/// Sources are tried in order and the first non-empty one wins:
///
/// 1. the `HOSTNAME` environment variable (set by most container runtimes)
/// 2. `/etc/machine-id`
/// 3. `/etc/hostname`
///
/// The host is identified by name, not by a network interface (MAC) address.
/// Supply another [`HostIdentifier`] where a hardware address is required.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHost;

impl HostIdentifier for SystemHost {
    fn host_identifier(&self) -> Option<Vec<u8>> {
        if let Some(name) = env::var("HOSTNAME").ok().and_then(non_empty) {
            return Some(name.into_bytes());
        }

        ["/etc/machine-id", "/etc/hostname"]
            .into_iter()
            .filter_map(|path| fs::read_to_string(path).ok())
            .find_map(non_empty)
            .map(String::into_bytes)
    }
}

/// A host identifier supplied by the caller (a pod name, a rack label, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedHost(Vec<u8>);

impl FixedHost {
    pub fn new(identifier: impl Into<Vec<u8>>) -> Self {
        Self(identifier.into())
    }
}

impl HostIdentifier for FixedHost {
    fn host_identifier(&self) -> Option<Vec<u8>> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a. Deterministic across processes and platforms, unlike
/// `std`'s randomly keyed hasher.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
