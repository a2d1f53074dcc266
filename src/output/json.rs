//! JSON run summary
//!
//! Written once after collection completes. Results keep their arrival order,
//! which differs from run to run.

use crate::params::SimulationParameters;
use crate::unit::RunSummary;
use crate::walker::WalkerResult;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Step count statistics across walkers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonStepStats {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

impl JsonStepStats {
    /// `None` when there are no results
    pub fn from_results(results: &[WalkerResult]) -> Option<Self> {
        let min = results.iter().map(|r| r.steps_taken).min()?;
        let max = results.iter().map(|r| r.steps_taken).max()?;
        let total: f64 = results.iter().map(|r| r.steps_taken as f64).sum();

        Some(Self {
            min,
            max,
            mean: total / results.len() as f64,
        })
    }
}

/// Complete JSON document for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunSummary {
    /// RFC 3339 start time
    pub started_at: String,
    pub units: usize,
    pub walkers: usize,
    pub parameters: SimulationParameters,
    pub elapsed: JsonDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<JsonStepStats>,
    /// Results in arrival order
    pub results: Vec<WalkerResult>,
}

impl JsonRunSummary {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            started_at: summary.started_at.to_rfc3339(),
            units: summary.units,
            walkers: summary.results.len(),
            parameters: summary.parameters,
            elapsed: JsonDuration::from_duration(summary.elapsed),
            steps: JsonStepStats::from_results(&summary.results),
            results: summary.results.clone(),
        }
    }
}

/// Write the run summary to `output_path`
pub fn write_json_output(output_path: &Path, summary: &RunSummary, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let writer = BufWriter::new(file);
    let document = JsonRunSummary::from_summary(summary);

    if pretty {
        serde_json::to_writer_pretty(writer, &document)?;
    } else {
        serde_json::to_writer(writer, &document)?;
    }

    Ok(())
}

/// Format duration in human-readable format
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    }
}
