use crate::{
    AtomicGenerator, BitLayout, CachedGenerator, ConcurrencyStrategy, DEFAULT_CACHE_SIZE, Error,
    Generator, GeneratorOptions, HostIdentifier, Identity, IdentitySource, IdentityStrategy,
    LockGenerator, MAX_LAYOUT_BITS, RandSource, Result, SequenceSeed, SystemClock, SystemHost,
    TWITTER_EPOCH, ThreadRandom, TimeSource,
};

/// A validated generator configuration.
///
/// Produced by [`configure`]; every value in here has already been checked,
/// so building allocators from it cannot fail on configuration grounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    layout: BitLayout,
    identity: Identity,
    strategy: ConcurrencyStrategy,
    cache_size: usize,
    random_sequence_limit: u64,
}

/// Validates `options` against the system clock and host.
///
/// # Errors
///
/// - [`Error::Configuration`] if a width is negative, the widths sum to more
///   than 63 bits, the epoch is negative or in the future, specified ids are
///   missing or out of range, or the cached strategy is given a zero cache
///   size.
/// - [`Error::IdentityAssignment`] if hardware-derived identity cannot read
///   a host identifier and the random fallback is disabled.
///
/// # Example
/// ```
/// use keyflake::{GeneratorOptions, IdAllocator, IdentitySource, configure};
///
/// let options = GeneratorOptions {
///     identity_strategy: IdentitySource::Specified,
///     worker_id: Some(3),
///     datacenter_id: Some(7),
///     ..GeneratorOptions::default()
/// };
/// let generator = configure(&options).unwrap().build().unwrap();
///
/// let id = generator.next_id().unwrap();
/// let decoded = generator.decode(id);
/// assert_eq!((decoded.datacenter_id, decoded.worker_id), (7, 3));
/// ```
pub fn configure(options: &GeneratorOptions) -> Result<Config> {
    configure_with(options, &SystemClock, &SystemHost, &ThreadRandom)
}

/// [`configure`] with an explicit clock, host identifier and random source.
///
/// # Errors
///
/// Same as [`configure`].
pub fn configure_with<T, H, R>(
    options: &GeneratorOptions,
    time: &T,
    host: &H,
    rng: &R,
) -> Result<Config>
where
    T: TimeSource + ?Sized,
    H: HostIdentifier + ?Sized,
    R: RandSource,
{
    let resolution = options.resolution;
    let epoch = match options.epoch_timestamp {
        Some(epoch) => u64::try_from(epoch)
            .map_err(|_| Error::config(format!("epoch {epoch} must not be negative")))?,
        None => resolution.ticks_from_duration(TWITTER_EPOCH),
    };
    let now = resolution.ticks_from_millis(time.current_millis());
    if epoch > now {
        return Err(Error::config(format!(
            "epoch {epoch}{unit} lies in the future (now {now}{unit})",
            unit = resolution.unit()
        )));
    }

    let configured = BitLayout::new(
        width("timestamp", options.timestamp_bits)?,
        width("datacenter", options.datacenter_bits)?,
        width("worker", options.worker_bits)?,
        width("sequence", options.sequence_bits)?,
        epoch,
        resolution,
    )?;

    let strategy = match options.identity_strategy {
        IdentitySource::Specified => IdentityStrategy::Specified {
            worker_id: explicit_id("worker_id", options.worker_id)?,
            datacenter_id: explicit_id("datacenter_id", options.datacenter_id)?,
        },
        IdentitySource::Hardware => IdentityStrategy::HardwareDerived,
        IdentitySource::Default => IdentityStrategy::DefaultFixedLayout,
    };
    let layout = strategy.layout(configured);

    // `epoch <= now` was checked above and every strategy keeps the epoch.
    let elapsed = now - layout.epoch();
    if elapsed > layout.max_timestamp() {
        return Err(Error::config(format!(
            "a {}-bit timestamp cannot hold the {elapsed}{unit} elapsed since epoch {epoch}{unit}",
            layout.timestamp_bits(),
            unit = resolution.unit()
        )));
    }

    let identity = strategy.resolve(
        &layout,
        host,
        options.random_identity_fallback.then_some(rng),
    )?;

    let cache_size = options.cache_size.unwrap_or(DEFAULT_CACHE_SIZE);
    if options.concurrency_strategy == ConcurrencyStrategy::Cached && cache_size == 0 {
        return Err(Error::config("cache size must be greater than 0"));
    }

    Ok(Config {
        layout,
        identity,
        strategy: options.concurrency_strategy,
        cache_size,
        random_sequence_limit: options.random_sequence_limit,
    })
}

fn width(field: &str, bits: i32) -> Result<u8> {
    if bits < 0 {
        return Err(Error::config(format!(
            "{field} bits must not be negative, got {bits}"
        )));
    }
    u8::try_from(bits)
        .ok()
        .filter(|bits| u32::from(*bits) <= MAX_LAYOUT_BITS)
        .ok_or_else(|| {
            Error::config(format!(
                "{field} bits {bits} exceed the {MAX_LAYOUT_BITS} available"
            ))
        })
}

fn explicit_id(field: &str, value: Option<i64>) -> Result<u64> {
    let value = value.ok_or_else(|| {
        Error::config(format!("the specified identity strategy requires {field}"))
    })?;
    u64::try_from(value)
        .map_err(|_| Error::config(format!("{field} must not be negative, got {value}")))
}

impl Config {
    pub const fn layout(&self) -> &BitLayout {
        &self.layout
    }

    pub const fn identity(&self) -> Identity {
        self.identity
    }

    pub const fn strategy(&self) -> ConcurrencyStrategy {
        self.strategy
    }

    /// Queue capacity used when the strategy is
    /// [`ConcurrencyStrategy::Cached`].
    pub const fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub const fn random_sequence_limit(&self) -> u64 {
        self.random_sequence_limit
    }

    /// Builds the configured allocator on the system clock.
    ///
    /// # Errors
    ///
    /// [`Error::ProducerSpawn`] if the cached strategy's producer thread
    /// cannot be started.
    pub fn build(&self) -> Result<Generator> {
        self.build_with(SystemClock, ThreadRandom)
    }

    /// Builds the configured allocator on an explicit clock and random
    /// source.
    ///
    /// # Errors
    ///
    /// Same as [`Config::build`].
    pub fn build_with<T, R>(&self, time: T, rng: R) -> Result<Generator<T, R>>
    where
        T: TimeSource + Send + Sync + 'static,
        R: RandSource + Send + Sync + 'static,
    {
        let seed = SequenceSeed::with_rand(rng, self.random_sequence_limit);
        let generator = match self.strategy {
            ConcurrencyStrategy::Sync => {
                LockGenerator::with_seed(self.layout, self.identity, time, seed).into()
            }
            ConcurrencyStrategy::LockFree => {
                AtomicGenerator::with_seed(self.layout, self.identity, time, seed).into()
            }
            ConcurrencyStrategy::Cached => {
                let source = LockGenerator::with_seed(self.layout, self.identity, time, seed);
                CachedGenerator::new(source, self.cache_size)?.into()
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            layout = %self.layout,
            worker_id = self.identity.worker_id(),
            datacenter_id = self.identity.datacenter_id(),
            strategy = %self.strategy,
            "id generator ready"
        );

        Ok(generator)
    }
}
