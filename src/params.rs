//! Simulation parameters and their startup resolution
//!
//! Only the coordinator resolves parameters. The resolved value is then handed
//! to every walker through the fabric broadcast, so no unit ever derives its
//! own copy.
//!
//! # Precedence
//!
//! 1. A pair of whitespace-separated integers read from the input stream
//! 2. Exactly two positional arguments `<domain_size> <max_steps>`
//! 3. Otherwise a usage error; nothing is broadcast and no walk runs

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use thiserror::Error;
use tracing::debug;

/// Run parameters shared by every unit
///
/// Neither field is validated. A non-positive `domain_size` absorbs every
/// walker on its first move and a non-positive `max_steps` ends every walk
/// before the first move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Half-width of the domain; the walk ends at `-domain_size` or `domain_size`
    pub domain_size: i64,

    /// Maximum number of moves a walker may make
    pub max_steps: i64,
}

impl SimulationParameters {
    pub fn new(domain_size: i64, max_steps: i64) -> Self {
        Self {
            domain_size,
            max_steps,
        }
    }

    /// True when `position` lies on or beyond either boundary
    #[inline]
    pub fn is_outside(&self, position: i64) -> bool {
        position <= self.domain_size.saturating_neg() || position >= self.domain_size
    }
}

/// Startup parameters could not be determined
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Usage: {program} <domain_size> <max_steps>")]
    Usage { program: String },
}

/// Where the coordinator looks for its parameters
pub struct ParameterSource {
    program: String,
    positional: Vec<String>,
    input: Option<Box<dyn BufRead>>,
}

impl ParameterSource {
    /// Create a source backed only by positional arguments
    pub fn new(program: impl Into<String>, positional: Vec<String>) -> Self {
        Self {
            program: program.into(),
            positional,
            input: None,
        }
    }

    /// Attach an input stream; a pair read from it wins over the arguments
    pub fn with_input<R: BufRead + 'static>(mut self, input: R) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Resolve the parameters following the documented precedence
    pub fn resolve(self) -> Result<SimulationParameters, ParameterError> {
        if let Some(input) = self.input {
            if let Some((domain_size, max_steps)) = read_pair(input) {
                debug!(domain_size, max_steps, "parameters read from input stream");
                return Ok(SimulationParameters::new(domain_size, max_steps));
            }
        }

        let usage = || ParameterError::Usage {
            program: self.program.clone(),
        };

        match self.positional.as_slice() {
            [domain, steps] => {
                let domain_size = domain.trim().parse::<i64>().map_err(|_| usage())?;
                let max_steps = steps.trim().parse::<i64>().map_err(|_| usage())?;
                debug!(domain_size, max_steps, "parameters taken from arguments");
                Ok(SimulationParameters::new(domain_size, max_steps))
            }
            _ => Err(usage()),
        }
    }
}

/// Read two whitespace-separated integers from `reader`
///
/// The pair may span lines. Returns `None` at end of input, on a read error,
/// or as soon as a token is not an integer.
pub fn read_pair<R: BufRead>(mut reader: R) -> Option<(i64, i64)> {
    let mut values = Vec::with_capacity(2);
    let mut line = String::new();

    while values.len() < 2 {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }

        for token in line.split_whitespace() {
            values.push(token.parse::<i64>().ok()?);
            if values.len() == 2 {
                break;
            }
        }
    }

    Some((values[0], values[1]))
}
