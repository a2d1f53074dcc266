//! TOML run configuration parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML run configuration file
pub fn parse_toml_file(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML run configuration from string
pub fn parse_toml_string(contents: &str) -> Result<RunConfig> {
    let config: RunConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with a run configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: RunConfig) -> RunConfig {
    if let Some(units) = cli.units {
        config.units = units;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(timeout_ms) = cli.collect_timeout_ms {
        config.collect_timeout_ms = Some(timeout_ms);
    }
    if let Some(ref path) = cli.json {
        config.json_output = Some(path.clone());
    }
    if cli.compact_json {
        config.json_pretty = false;
    }

    config
}

/// Build the run configuration from an optional file plus CLI overrides
pub fn build_config(cli: &Cli) -> Result<RunConfig> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => RunConfig::default(),
    };

    Ok(merge_cli_with_config(cli, base))
}
