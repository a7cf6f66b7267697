use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::MonitoringConfig;

/// Install the JSON subscriber for the API and CLI.
pub fn init_logging(config: &MonitoringConfig) -> Result<()> {
    let filter = log_filter(std::env::var("RUST_LOG").ok(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// A parseable `RUST_LOG` wins; otherwise the configured level must parse.
fn log_filter(env_directives: Option<String>, configured: &str) -> Result<EnvFilter> {
    if let Some(filter) = env_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(configured).with_context(|| format!("Invalid log level: {configured}"))
}
