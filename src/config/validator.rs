//! Configuration validation
//!
//! Only the run configuration is validated. Simulation parameters are
//! deliberately accepted as given, including non-positive values.

use super::*;
use anyhow::Result;

/// Largest unit count accepted; each unit is an OS thread
pub const MAX_UNITS: usize = 65_536;

/// Validate complete run configuration
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_units(config.units)?;

    if let Some(timeout_ms) = config.collect_timeout_ms {
        if timeout_ms == 0 {
            anyhow::bail!("collect_timeout_ms must be greater than 0");
        }
    }

    if let Some(ref path) = config.json_output {
        if path.as_os_str().is_empty() {
            anyhow::bail!("json_output must not be empty");
        }
    }

    Ok(())
}

/// Validate the unit count
pub fn validate_units(units: usize) -> Result<()> {
    if units == 0 {
        anyhow::bail!("units must be at least 1 (the coordinator)");
    }
    if units > MAX_UNITS {
        anyhow::bail!("units must be at most {}, got {}", MAX_UNITS, units);
    }
    Ok(())
}
