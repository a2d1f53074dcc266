//! Unit roles and the thread-per-unit launcher
//!
//! Every unit gets one fabric endpoint and exactly one role, decided once
//! from its rank. Walkers run on their own named threads; the coordinator
//! runs on the calling thread so the report sink need not be `Send`.

use crate::config::RunConfig;
use crate::coordinator;
use crate::fabric::{Fabric, Rank, ROOT};
use crate::output::Report;
use crate::params::{ParameterSource, SimulationParameters};
use crate::walker::{self, WalkerResult};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a unit does for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Walker,
}

impl Role {
    /// Rank 0 coordinates; every other rank walks
    pub fn for_rank(rank: Rank) -> Self {
        if rank == ROOT {
            Role::Coordinator
        } else {
            Role::Walker
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub units: usize,
    pub parameters: SimulationParameters,
    /// Results in arrival order
    pub results: Vec<WalkerResult>,
    pub elapsed: Duration,
}

/// One simulation run over a fresh fabric
pub struct Simulation {
    config: RunConfig,
}

impl Simulation {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Launch every unit and wait for the run to finish
    ///
    /// Returns the coordinator's error if it failed; a `ParameterError` means
    /// no broadcast happened and no walker walked. Walker threads are only
    /// joined after a successful collection.
    pub fn run<R: Report>(&self, source: ParameterSource, report: R) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();
        let units = self.config.units;

        let mut coordinator_endpoint = None;
        let mut walkers = Vec::with_capacity(self.config.walkers());

        for endpoint in Fabric::new(units).into_endpoints() {
            let rank = endpoint.rank();
            match Role::for_rank(rank) {
                Role::Coordinator => coordinator_endpoint = Some(endpoint),
                Role::Walker => {
                    let seed = self.config.seed;
                    let handle = thread::Builder::new()
                        .name(format!("walker-{}", rank))
                        .spawn(move || walker::run(endpoint, seed))
                        .with_context(|| format!("Failed to spawn walker {}", rank))?;
                    walkers.push((rank, handle));
                }
            }
        }

        let endpoint = coordinator_endpoint.context("Fabric has no coordinator rank")?;
        debug!(units, walkers = walkers.len(), "units launched");

        let collected = coordinator::run(endpoint, source, self.config.collect_timeout(), report);

        // A walker that missed the deadline may never finish; leave it detached
        let collection = match collected {
            Ok(collection) => collection,
            Err(e) => {
                debug!(walkers = walkers.len(), "coordinator failed, not joining walkers");
                return Err(e);
            }
        };

        for (rank, handle) in walkers {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(rank, error = ?e, "walker failed"),
                Err(_) => warn!(rank, "walker thread panicked"),
            }
        }

        Ok(RunSummary {
            started_at,
            units,
            parameters: collection.parameters,
            results: collection.results,
            elapsed: start.elapsed(),
        })
    }
}
