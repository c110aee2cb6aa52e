use crate::{BitLayout, Error, HostIdentifier, RandSource, Result, identity::host::fnv1a};

/// The `(worker_id, datacenter_id)` pair stamped into every id an allocator
/// issues.
///
/// Uniqueness across processes rests entirely on no two live allocators
/// sharing an identity under the same layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Identity {
    worker_id: u64,
    datacenter_id: u64,
}

impl Identity {
    /// Creates an identity, checking both ids against `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either id does not fit its field.
    pub fn new(worker_id: u64, datacenter_id: u64, layout: &BitLayout) -> Result<Self> {
        if worker_id > layout.max_worker_id() {
            return Err(Error::config(format!(
                "worker id {worker_id} exceeds the layout maximum of {}",
                layout.max_worker_id()
            )));
        }
        if datacenter_id > layout.max_datacenter_id() {
            return Err(Error::config(format!(
                "datacenter id {datacenter_id} exceeds the layout maximum of {}",
                layout.max_datacenter_id()
            )));
        }
        Ok(Self::new_unchecked(worker_id, datacenter_id))
    }

    pub(crate) const fn new_unchecked(worker_id: u64, datacenter_id: u64) -> Self {
        Self {
            worker_id,
            datacenter_id,
        }
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }
}

/// How an allocator obtains its [`Identity`] at start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityStrategy {
    /// Explicit ids from configuration, validated against the layout.
    Specified { worker_id: u64, datacenter_id: u64 },
    /// Ids hashed from a [`HostIdentifier`].
    ///
    /// Zero configuration, but two processes on the same host (or two hosts
    /// whose identifiers hash alike) can collide. Deployments that run more
    /// than one allocator per host should prefer [`Self::Specified`].
    HardwareDerived,
    /// Ignores the configured widths in favour of [`BitLayout::standard`] and
    /// derives ids from the host like [`Self::HardwareDerived`].
    DefaultFixedLayout,
}

impl IdentityStrategy {
    /// The layout this strategy actually allocates under, given the one that
    /// was configured.
    pub const fn layout(&self, configured: BitLayout) -> BitLayout {
        match self {
            Self::DefaultFixedLayout => {
                BitLayout::standard(configured.resolution(), configured.epoch())
            }
            Self::Specified { .. } | Self::HardwareDerived => configured,
        }
    }

    /// Resolves the identity for `layout`.
    ///
    /// `fallback` is consulted only when the host yields no identifier; pass
    /// `None` to turn that situation into an error instead.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if specified ids do not fit the layout.
    /// - [`Error::IdentityAssignment`] if the host has no identifier and no
    ///   fallback was given.
    pub fn resolve<H, R>(&self, layout: &BitLayout, host: &H, fallback: Option<&R>) -> Result<Identity>
    where
        H: HostIdentifier + ?Sized,
        R: RandSource,
    {
        let identity = match *self {
            Self::Specified {
                worker_id,
                datacenter_id,
            } => Identity::new(worker_id, datacenter_id, layout)?,
            Self::HardwareDerived | Self::DefaultFixedLayout => {
                derive_from_host(layout, host, fallback)?
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            strategy = ?self,
            worker_id = identity.worker_id(),
            datacenter_id = identity.datacenter_id(),
            "resolved allocator identity"
        );

        Ok(identity)
    }
}

fn derive_from_host<H, R>(layout: &BitLayout, host: &H, fallback: Option<&R>) -> Result<Identity>
where
    H: HostIdentifier + ?Sized,
    R: RandSource,
{
    let seed = match host.host_identifier() {
        Some(bytes) if !bytes.is_empty() => fnv1a(&bytes),
        _ => {
            let rng = fallback.ok_or(Error::IdentityAssignment)?;
            #[cfg(feature = "tracing")]
            tracing::warn!("no host identifier available; falling back to a random identity");
            rng.rand()
        }
    };

    let datacenter_id = seed % (layout.max_datacenter_id() + 1);

    // Co-located processes share the host seed, so the worker id also mixes
    // in the pid.
    let mut salt = [0_u8; 12];
    salt[..8].copy_from_slice(&datacenter_id.to_be_bytes());
    salt[8..].copy_from_slice(&std::process::id().to_be_bytes());
    let worker_id = fnv1a(&salt) % (layout.max_worker_id() + 1);

    Ok(Identity::new_unchecked(worker_id, datacenter_id))
}
