//! Logging subscriber initialisation.

use std::io;

use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. Logs go to stderr so stdout only carries the quote.
pub(crate) fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    match config.log_format {
        LogFormat::Compact => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stderr),
        ),
        LogFormat::Json => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_writer(io::stderr),
        ),
    }
}

// `log_level` already holds `--log-level` or `RUST_LOG`, so the filter is
// built from it rather than read from the environment again.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::new(format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn",
        config.log_level
    ))
}

fn init_with_layer<L>(config: &LoggingConfig, fmt_layer: L) -> Result<(), TryInitError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(config))
        .try_init()
}
