//! Tracing subscriber bootstrap for hosts that do not install their own.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber with an env-filter.
///
/// `RUST_LOG` takes precedence over `default_filter`. Fails if a
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing subscriber: {e}"))
}
