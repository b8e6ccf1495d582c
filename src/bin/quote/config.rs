//! Quote configuration

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level or filter directives (trace, debug, info, warn, error).
    /// The flag takes precedence over `RUST_LOG`.
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// How the quote is printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table with a total line.
    Table,

    /// JSON document with the total and breakdown.
    Json,
}

/// Price an order form selection against a service catalog
#[derive(Debug, Parser)]
#[command(name = "quote", about = "Price an order form selection against a service catalog", long_about = None)]
pub struct QuoteConfig {
    /// Catalog location, an http(s) URL or a file path
    #[arg(short, long, env = "PRICELIST_CATALOG")]
    pub catalog: String,

    /// Pricing policy YAML file, the hosted service policy when omitted
    #[arg(short, long, env = "PRICELIST_POLICY")]
    pub policy: Option<PathBuf>,

    /// Catalog request timeout in seconds
    #[arg(long, env = "PRICELIST_TIMEOUT_SECONDS", default_value_t = 10_u64)]
    pub timeout_seconds: u64,

    /// ISO currency code used to display prices
    #[arg(long, env = "PRICELIST_CURRENCY", default_value = "USD")]
    pub currency: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Selections as `key=value`; a bare `key` means `key=yes`
    #[arg(value_parser = parse_selection)]
    pub selections: Vec<(String, String)>,
}

impl QuoteConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').unwrap_or((raw, "yes"));

    if key.trim().is_empty() {
        return Err(format!("selection `{raw}` has no key"));
    }

    Ok((key.to_string(), value.to_string()))
}
