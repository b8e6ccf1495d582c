//! Pricelist quote CLI
//!
//! Fetches a catalog, builds the price index and prints the price of the
//! selections given on the command line.

use std::{
    collections::BTreeMap,
    io::{self, Write},
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use humanize_duration::{Truncate, prelude::DurationExt};
use serde::Serialize;
use tracing::{error, info};

use pricelist::prelude::*;

use crate::config::{OutputFormat, QuoteConfig};

mod config;
mod logging;

/// Quote output in JSON format
#[derive(Debug, Serialize)]
struct QuoteOutput<'a> {
    total: i64,
    breakdown: BTreeMap<&'a str, &'a ResultItem>,
}

impl<'a> From<&'a Evaluation> for QuoteOutput<'a> {
    fn from(evaluation: &'a Evaluation) -> Self {
        Self {
            total: evaluation.total(),
            breakdown: evaluation
                .breakdown()
                .iter()
                .map(|(key, entry)| (key.as_str(), entry))
                .collect(),
        }
    }
}

/// Quote CLI entry point
pub fn main() -> ExitCode {
    let config = match QuoteConfig::load() {
        Ok(config) => config,
        Err(err) => err.exit(),
    };

    if let Err(err) = logging::init(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Logging error: {err}");
        }

        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");

            ExitCode::FAILURE
        }
    }
}

fn run(config: &QuoteConfig) -> Result<()> {
    let policy = match &config.policy {
        Some(path) => PricingPolicy::from_path(path)
            .with_context(|| format!("loading policy {}", path.display()))?,
        None => PricingPolicy::hosted(),
    };

    let source = source_for(&config.catalog, Duration::from_secs(config.timeout_seconds))?;

    let start = Instant::now();

    let catalog = fetch_catalog(source.as_ref())
        .with_context(|| format!("loading catalog from {}", source.location()))?;

    let index = PriceIndex::build(&catalog, policy);

    info!(
        location = %source.location(),
        items = index.len(),
        "catalog indexed in {}",
        start.elapsed().human(Truncate::Nano)
    );

    let evaluation = index.evaluate_verbose(
        config
            .selections
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match config.format {
        OutputFormat::Table => {
            Receipt::from_evaluation(&evaluation, &config.currency)?.write_to(&mut handle)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut handle, &QuoteOutput::from(&evaluation))?;
            writeln!(handle)?;
        }
    }

    Ok(())
}
