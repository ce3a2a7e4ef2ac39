//! Configuration loading for the CLI
//!
//! Layers, later ones winning: the config file (if present), `GATEHOUSE_*`
//! environment variables, then command-line overrides.

use anyhow::{Context, Result};
use gatehouse_core::{GatehouseConfig, PolicyEngineConfig};
use std::path::Path;
use tracing::debug;

/// Load and validate the engine configuration
pub fn load_config(path: &Path, overrides: &PolicyEngineConfig) -> Result<PolicyEngineConfig> {
    let mut config = load_file(path)?;
    config.merge_with_env()?;
    finish(config, overrides)
}

fn load_file(path: &Path) -> Result<PolicyEngineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(PolicyEngineConfig::default());
    }
    PolicyEngineConfig::load_from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn finish(
    mut config: PolicyEngineConfig,
    overrides: &PolicyEngineConfig,
) -> Result<PolicyEngineConfig> {
    config.merge_with(overrides)?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
