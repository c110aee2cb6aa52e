mod config;
mod telemetry;

use std::io::{self, BufWriter, Write};

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, Command};
use keyflake::{Config, GeneratorOptions, IdAllocator, configure};
use telemetry::init_tracing;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    init_tracing()?;

    let options = GeneratorOptions::try_from(args.generator)?;
    let config = configure(&options).context("invalid generator configuration")?;

    match args.command {
        Command::Generate { count, decode } => generate(&config, count, decode),
        Command::Decode { ids } => decode_ids(&config, &ids),
    }
}

fn generate(config: &Config, count: usize, decode: bool) -> anyhow::Result<()> {
    let generator = config.build().context("failed to start the generator")?;
    tracing::debug!(count, strategy = %generator.strategy(), "generating ids");

    let mut out = BufWriter::new(io::stdout().lock());
    for _ in 0..count {
        let id = generator.next_id().context("id allocation failed")?;
        if decode {
            writeln!(out, "{id}\t{}", generator.decode(id))?;
        } else {
            writeln!(out, "{id}")?;
        }
    }
    out.flush()?;

    Ok(())
}

fn decode_ids(config: &Config, ids: &[i64]) -> anyhow::Result<()> {
    let layout = config.layout();
    tracing::debug!(%layout, count = ids.len(), "decoding ids");

    let mut out = BufWriter::new(io::stdout().lock());
    for &id in ids {
        writeln!(out, "{id}\t{}", layout.decode(id))?;
    }
    out.flush()?;

    Ok(())
}
