//! Tracing subscriber setup for the command-line driver.
//!
//! Log lines go to stderr so stdout stays clean for reports and predictions.
//! `RUST_LOG` wins over the default `info` level; `--verbose` forces `debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing_subscriber::util::TryInitError),
}

pub fn init(verbose: bool) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
