//! Tracing subscriber setup for the CLI.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::EcostatError;

/// Filter from `RUST_LOG`, else the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter, EcostatError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| EcostatError::Logging(format!("invalid log level '{}': {}", level, e))),
    }
}

/// Installs the global subscriber and bridges `log` records into it.
/// Logs go to stderr so stdout carries only the answer.
pub fn init(config: &LoggingConfig) -> Result<(), EcostatError> {
    let filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    installed.map_err(|e| EcostatError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| EcostatError::Logging(e.to_string()))?;
    Ok(())
}
