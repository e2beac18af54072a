//! Tracing subscriber initialization.
//!
//! The subscriber is configured from `LoggerConfig`: an EnvFilter built from
//! the configured level (overridable via `RUST_LOG`), emitting either JSON or
//! human-readable output.

use tracing_subscriber::EnvFilter;

use crate::config::settings::{LogFormat, LoggerConfig};

/// Installs the global tracing subscriber. Call once at startup.
pub fn init(config: &LoggerConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
    }

    Ok(())
}
