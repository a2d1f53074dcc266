//! Configuration module
//!
//! Handles CLI argument parsing, TOML run files, and validation. The
//! simulation parameters themselves are not part of the run configuration;
//! they are resolved by the coordinator at startup (see `params`).

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Total units, coordinator included
    #[serde(default = "default_units")]
    pub units: usize,
    /// Base seed mixed with each walker's rank; wall clock when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Give up collecting after this long; wait indefinitely when absent
    #[serde(default)]
    pub collect_timeout_ms: Option<u64>,
    /// Write a JSON run summary here
    #[serde(default)]
    pub json_output: Option<PathBuf>,
    /// Pretty-print the JSON summary
    #[serde(default = "default_json_pretty")]
    pub json_pretty: bool,
}

fn default_units() -> usize {
    num_cpus::get()
}

fn default_json_pretty() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            seed: None,
            collect_timeout_ms: None,
            json_output: None,
            json_pretty: default_json_pretty(),
        }
    }
}

impl RunConfig {
    /// Number of walker units
    pub fn walkers(&self) -> usize {
        self.units.saturating_sub(1)
    }

    pub fn collect_timeout(&self) -> Option<Duration> {
        self.collect_timeout_ms.map(Duration::from_millis)
    }
}
