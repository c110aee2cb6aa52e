use anyhow::bail;
use clap::{ArgAction, Args, Parser, Subcommand};
use keyflake::{
    ConcurrencyStrategy, DEFAULT_RANDOM_SEQUENCE_LIMIT, GeneratorOptions, IdentitySource,
    Resolution,
};

/// Command-line interface for the `keyflake` binary.
///
/// Every generator option can also be supplied through its environment
/// variable (or a `.env` file in the working directory); explicit flags win.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyflake",
    version,
    about = "Generate and decode Snowflake-style 64-bit IDs"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Allocate ids and print one per line.
    Generate {
        /// Number of ids to allocate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Print the decoded fields next to each id.
        #[arg(short, long, default_value_t = false)]
        decode: bool,
    },

    /// Decode ids allocated under the configured layout.
    Decode {
        /// Ids to decode, in decimal.
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },
}

/// Generator options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// Width of the timestamp field in bits.
    ///
    /// Environment variable: `KEYFLAKE_TIMESTAMP_BITS`
    #[arg(long, global = true, env = "KEYFLAKE_TIMESTAMP_BITS", default_value_t = 41, allow_negative_numbers = true)]
    pub timestamp_bits: i32,

    /// Width of the datacenter field in bits.
    ///
    /// Environment variable: `KEYFLAKE_DATACENTER_BITS`
    #[arg(long, global = true, env = "KEYFLAKE_DATACENTER_BITS", default_value_t = 5, allow_negative_numbers = true)]
    pub datacenter_bits: i32,

    /// Width of the worker field in bits.
    ///
    /// Environment variable: `KEYFLAKE_WORKER_BITS`
    #[arg(long, global = true, env = "KEYFLAKE_WORKER_BITS", default_value_t = 5, allow_negative_numbers = true)]
    pub worker_bits: i32,

    /// Width of the sequence field in bits.
    ///
    /// Environment variable: `KEYFLAKE_SEQUENCE_BITS`
    #[arg(long, global = true, env = "KEYFLAKE_SEQUENCE_BITS", default_value_t = 12, allow_negative_numbers = true)]
    pub sequence_bits: i32,

    /// Zero point of the timestamp field, in ticks of `--resolution` since
    /// the UNIX epoch. Defaults to the Twitter epoch.
    ///
    /// Environment variable: `KEYFLAKE_EPOCH`
    #[arg(long, global = true, env = "KEYFLAKE_EPOCH", allow_negative_numbers = true)]
    pub epoch: Option<i64>,

    /// Timestamp resolution: `millisecond` or `second`.
    ///
    /// Environment variable: `KEYFLAKE_RESOLUTION`
    #[arg(long, global = true, env = "KEYFLAKE_RESOLUTION", default_value = "millisecond")]
    pub resolution: Resolution,

    /// Where the worker/datacenter identity comes from: `specified`,
    /// `hardware` or `default`.
    ///
    /// Environment variable: `KEYFLAKE_IDENTITY_STRATEGY`
    #[arg(long, global = true, env = "KEYFLAKE_IDENTITY_STRATEGY", default_value = "hardware")]
    pub identity_strategy: IdentitySource,

    /// Worker id; requires `--identity-strategy specified`.
    ///
    /// Environment variable: `KEYFLAKE_WORKER_ID`
    #[arg(long, global = true, env = "KEYFLAKE_WORKER_ID", allow_negative_numbers = true)]
    pub worker_id: Option<i64>,

    /// Datacenter id; requires `--identity-strategy specified`.
    ///
    /// Environment variable: `KEYFLAKE_DATACENTER_ID`
    #[arg(long, global = true, env = "KEYFLAKE_DATACENTER_ID", allow_negative_numbers = true)]
    pub datacenter_id: Option<i64>,

    /// Allocation strategy: `sync`, `lockfree` or `cached`.
    ///
    /// Environment variable: `KEYFLAKE_CONCURRENCY_STRATEGY`
    #[arg(long, global = true, env = "KEYFLAKE_CONCURRENCY_STRATEGY", default_value = "sync")]
    pub concurrency_strategy: ConcurrencyStrategy,

    /// Queue capacity of the cached strategy.
    ///
    /// Environment variable: `KEYFLAKE_CACHE_SIZE`
    #[arg(long, global = true, env = "KEYFLAKE_CACHE_SIZE")]
    pub cache_size: Option<usize>,

    /// Upper bound of the random starting sequence of each tick; 0 disables
    /// it.
    ///
    /// Environment variable: `KEYFLAKE_RANDOM_SEQUENCE_LIMIT`
    #[arg(long, global = true, env = "KEYFLAKE_RANDOM_SEQUENCE_LIMIT", default_value_t = DEFAULT_RANDOM_SEQUENCE_LIMIT)]
    pub random_sequence_limit: u64,

    /// Fall back to a random identity when the host exposes no identifier.
    ///
    /// Environment variable: `KEYFLAKE_RANDOM_IDENTITY_FALLBACK`
    #[arg(long, global = true, env = "KEYFLAKE_RANDOM_IDENTITY_FALLBACK", default_value_t = true, action = ArgAction::Set)]
    pub random_identity_fallback: bool,
}

impl TryFrom<GeneratorArgs> for GeneratorOptions {
    type Error = anyhow::Error;

    fn try_from(args: GeneratorArgs) -> Result<Self, Self::Error> {
        let specified = args.identity_strategy == IdentitySource::Specified;
        if !specified && (args.worker_id.is_some() || args.datacenter_id.is_some()) {
            bail!(
                "KEYFLAKE_WORKER_ID/KEYFLAKE_DATACENTER_ID are only used with the `specified` \
                 identity strategy (got `{:?}`)",
                args.identity_strategy
            );
        }

        if args.cache_size.is_some() && args.concurrency_strategy != ConcurrencyStrategy::Cached {
            bail!(
                "KEYFLAKE_CACHE_SIZE is only used with the `cached` concurrency strategy (got `{}`)",
                args.concurrency_strategy
            );
        }

        Ok(Self {
            timestamp_bits: args.timestamp_bits,
            datacenter_bits: args.datacenter_bits,
            worker_bits: args.worker_bits,
            sequence_bits: args.sequence_bits,
            epoch_timestamp: args.epoch,
            resolution: args.resolution,
            identity_strategy: args.identity_strategy,
            worker_id: args.worker_id,
            datacenter_id: args.datacenter_id,
            concurrency_strategy: args.concurrency_strategy,
            cache_size: args.cache_size,
            random_sequence_limit: args.random_sequence_limit,
            random_identity_fallback: args.random_identity_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_library_defaults() {
        let args = parse(&["keyflake", "generate"]);
        let options = GeneratorOptions::try_from(args.generator).unwrap();
        assert_eq!(options, GeneratorOptions::default());
    }

    #[test]
    fn parses_generate_with_options() {
        let args = parse(&[
            "keyflake",
            "generate",
            "-n",
            "5",
            "--decode",
            "--identity-strategy",
            "specified",
            "--worker-id",
            "3",
            "--datacenter-id",
            "7",
            "--concurrency-strategy",
            "cached",
            "--cache-size",
            "64",
        ]);
        assert!(matches!(
            args.command,
            Command::Generate {
                count: 5,
                decode: true
            }
        ));

        let options = GeneratorOptions::try_from(args.generator).unwrap();
        assert_eq!(options.identity_strategy, IdentitySource::Specified);
        assert_eq!(options.worker_id, Some(3));
        assert_eq!(options.datacenter_id, Some(7));
        assert_eq!(options.concurrency_strategy, ConcurrencyStrategy::Cached);
        assert_eq!(options.cache_size, Some(64));
    }

    #[test]
    fn parses_decode_ids() {
        let args = parse(&["keyflake", "decode", "1", "-2", "3"]);
        match args.command {
            Command::Decode { ids } => assert_eq!(ids, vec![1, -2, 3]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decode_requires_an_id() {
        assert!(CliArgs::try_parse_from(["keyflake", "decode"]).is_err());
    }

    #[test]
    fn rejects_unknown_strategy_names() {
        assert!(
            CliArgs::try_parse_from(["keyflake", "generate", "--concurrency-strategy", "spin"])
                .is_err()
        );
    }

    #[test]
    fn rejects_explicit_ids_without_specified_strategy() {
        let args = parse(&["keyflake", "generate", "--worker-id", "1"]);
        assert!(GeneratorOptions::try_from(args.generator).is_err());
    }

    #[test]
    fn rejects_cache_size_without_cached_strategy() {
        let args = parse(&["keyflake", "generate", "--cache-size", "16"]);
        assert!(GeneratorOptions::try_from(args.generator).is_err());
    }

    #[test]
    fn random_identity_fallback_can_be_disabled() {
        let args = parse(&[
            "keyflake",
            "generate",
            "--random-identity-fallback",
            "false",
        ]);
        let options = GeneratorOptions::try_from(args.generator).unwrap();
        assert!(!options.random_identity_fallback);
    }
}
