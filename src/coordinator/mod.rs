//! Coordinator
//!
//! Rank 0 of the fabric. The coordinator:
//! - Resolves the run parameters
//! - Broadcasts them to every walker
//! - Collects exactly one result per walker, in arrival order
//! - Reports each result as it arrives, then a completion notice

use crate::fabric::{Endpoint, FabricError, Message, ParametersMessage, Rank};
use crate::output::Report;
use crate::params::{ParameterSource, SimulationParameters};
use crate::walker::WalkerResult;
use crate::Result;
use anyhow::Context;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Collection gave up before every walker reported
///
/// Only produced when a collection timeout is configured. Without one the
/// coordinator waits indefinitely for missing results.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("timed out after {waited:?} waiting for {} walker(s): {missing:?}", .missing.len())]
pub struct CollectionTimeout {
    pub waited: Duration,
    /// Walker ranks that never reported
    pub missing: Vec<Rank>,
}

/// Results gathered by one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub parameters: SimulationParameters,
    /// Results in arrival order
    pub results: Vec<WalkerResult>,
}

/// Coordinator role bound to the rank 0 endpoint
pub struct Coordinator<'a> {
    endpoint: &'a Endpoint,
    collect_timeout: Option<Duration>,
}

impl<'a> Coordinator<'a> {
    pub fn new(endpoint: &'a Endpoint) -> Self {
        Self {
            endpoint,
            collect_timeout: None,
        }
    }

    /// Bound the whole collection; `None` waits indefinitely
    pub fn with_collect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.collect_timeout = timeout;
        self
    }

    /// Number of walkers expected to report
    pub fn walker_count(&self) -> usize {
        self.endpoint.size().saturating_sub(1)
    }

    /// Broadcast `params` to every walker
    ///
    /// Returns once every walker holds the value, giving back the value as
    /// decoded from the broadcast bytes.
    pub fn distribute(&self, params: &SimulationParameters) -> Result<SimulationParameters> {
        let msg = Message::Parameters(ParametersMessage::new(params));

        match self.endpoint.broadcast(Some(&msg)).context("Parameter broadcast failed")? {
            Message::Parameters(sent) => {
                info!(
                    domain_size = sent.domain_size,
                    max_steps = sent.max_steps,
                    walkers = self.walker_count(),
                    "parameters distributed"
                );
                Ok(sent.parameters())
            }
            other => anyhow::bail!("Broadcast returned unexpected message {:?}", other),
        }
    }

    /// Collect one result from every walker, reporting each on arrival
    ///
    /// Arrival order is not sender order and is not assumed. With zero
    /// walkers only the completion notice is reported.
    pub fn collect<R: Report>(
        &self,
        parameters: SimulationParameters,
        mut report: R,
    ) -> Result<Collection> {
        let expected = self.walker_count();
        let mut results = Vec::with_capacity(expected);
        let mut reported = BTreeSet::new();
        let deadline = self
            .collect_timeout
            .and_then(|t| Instant::now().checked_add(t).map(|at| (t, at)));

        if expected == 0 {
            debug!("no walkers, skipping collection");
        }

        while results.len() < expected {
            let envelope = match deadline {
                None => self.endpoint.recv_any()?,
                Some((waited, at)) => {
                    let remaining = at.saturating_duration_since(Instant::now());
                    match self.endpoint.recv_any_timeout(remaining) {
                        Ok(envelope) => envelope,
                        Err(FabricError::Timeout(_)) => {
                            let missing: Vec<Rank> = (1..=expected)
                                .filter(|rank| !reported.contains(rank))
                                .collect();
                            error!(?missing, ?waited, "collection timed out");
                            return Err(CollectionTimeout { waited, missing }.into());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            };

            match envelope.message {
                Message::WalkComplete(msg) => {
                    if !reported.insert(envelope.source) {
                        warn!(source = envelope.source, "walker reported more than once");
                    }

                    let result = WalkerResult {
                        source: envelope.source,
                        steps_taken: msg.steps_taken,
                    };
                    report.walker_finished(&result)?;
                    results.push(result);
                }
                other => {
                    warn!(
                        source = envelope.source,
                        message = ?other,
                        "ignoring unexpected message"
                    );
                }
            }
        }

        report.all_complete()?;
        debug!(collected = results.len(), "collection complete");

        Ok(Collection {
            parameters,
            results,
        })
    }
}

/// Run the coordinator role on `endpoint`
///
/// If the parameters cannot be resolved the endpoint is dropped without
/// broadcasting, which releases every waiting walker, and the
/// `ParameterError` is returned.
pub fn run<R: Report>(
    endpoint: Endpoint,
    source: ParameterSource,
    collect_timeout: Option<Duration>,
    report: R,
) -> Result<Collection> {
    let params = source.resolve()?;

    let coordinator = Coordinator::new(&endpoint).with_collect_timeout(collect_timeout);
    let params = coordinator.distribute(&params)?;
    coordinator.collect(params, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::{Fabric, WalkCompleteMessage, ROOT};
    use crate::output::text::TextReport;
    use crate::params::ParameterError;
    use std::thread;

    fn done(steps_taken: i64) -> Message {
        Message::WalkComplete(WalkCompleteMessage { steps_taken })
    }

    fn lines(report: TextReport<Vec<u8>>) -> Vec<String> {
        String::from_utf8(report.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_no_walkers_only_completion() {
        let root = Fabric::new(1).into_endpoints().remove(0);
        let coordinator = Coordinator::new(&root);
        let mut report = TextReport::new(Vec::new());

        let collection = coordinator
            .collect(SimulationParameters::new(5, 5), &mut report)
            .unwrap();

        assert!(collection.results.is_empty());
        assert_eq!(lines(report), vec!["All walkers have completed their walks."]);
    }

    #[test]
    fn test_reports_in_arrival_order() {
        let mut endpoints = Fabric::new(4).into_endpoints();
        let root = endpoints.remove(0);

        endpoints[2].send(ROOT, &done(30)).unwrap();
        endpoints[0].send(ROOT, &done(10)).unwrap();
        endpoints[1].send(ROOT, &done(20)).unwrap();

        let mut report = TextReport::new(Vec::new());
        let collection = Coordinator::new(&root)
            .collect(SimulationParameters::new(5, 50), &mut report)
            .unwrap();

        let sources: Vec<Rank> = collection.results.iter().map(|r| r.source).collect();
        assert_eq!(sources, vec![3, 1, 2]);
        assert_eq!(
            lines(report),
            vec![
                "Walker 3 finished in 30 steps.",
                "Walker 1 finished in 10 steps.",
                "Walker 2 finished in 20 steps.",
                "All walkers have completed their walks.",
            ]
        );
    }

    #[test]
    fn test_collects_every_concurrent_walker() {
        let mut endpoints = Fabric::new(9).into_endpoints();
        let root = endpoints.remove(0);

        let handles: Vec<_> = endpoints
            .into_iter()
            .rev()
            .map(|endpoint| {
                thread::spawn(move || {
                    endpoint.send(ROOT, &done(endpoint.rank() as i64)).unwrap();
                })
            })
            .collect();

        let mut report = TextReport::new(Vec::new());
        let collection = Coordinator::new(&root)
            .collect(SimulationParameters::new(2, 2), &mut report)
            .unwrap();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut sources: Vec<Rank> = collection.results.iter().map(|r| r.source).collect();
        sources.sort_unstable();
        assert_eq!(sources, (1..=8).collect::<Vec<_>>());
        for result in &collection.results {
            assert_eq!(result.steps_taken, result.source as i64);
        }

        let lines = lines(report);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[8], "All walkers have completed their walks.");
    }

    #[test]
    fn test_timeout_names_missing_walkers() {
        let mut endpoints = Fabric::new(4).into_endpoints();
        let root = endpoints.remove(0);
        endpoints[1].send(ROOT, &done(5)).unwrap();

        let mut report = TextReport::new(Vec::new());
        let err = Coordinator::new(&root)
            .with_collect_timeout(Some(Duration::from_millis(50)))
            .collect(SimulationParameters::new(2, 2), &mut report)
            .unwrap_err();

        let timeout = err.downcast_ref::<CollectionTimeout>().unwrap();
        assert_eq!(timeout.missing, vec![1, 3]);
        assert_eq!(lines(report), vec!["Walker 2 finished in 5 steps."]);
    }

    #[test]
    fn test_distribute_returns_broadcast_value() {
        let mut endpoints = Fabric::new(3).into_endpoints();
        let root = endpoints.remove(0);
        let params = SimulationParameters::new(42, 4242);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| thread::spawn(move || endpoint.broadcast(None).unwrap()))
            .collect();

        let distributed = Coordinator::new(&root).distribute(&params).unwrap();
        assert_eq!(distributed, params);

        for handle in handles {
            match handle.join().unwrap() {
                Message::Parameters(msg) => assert_eq!(msg.parameters(), params),
                other => panic!("Wrong message type: {:?}", other),
            }
        }
    }

    #[test]
    fn test_run_with_unresolvable_parameters() {
        let mut endpoints = Fabric::new(3).into_endpoints();
        let root = endpoints.remove(0);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| thread::spawn(move || endpoint.broadcast(None)))
            .collect();

        let mut report = TextReport::new(Vec::new());
        let err = run(root, ParameterSource::new("rw", vec![]), None, &mut report).unwrap_err();

        assert!(err.downcast_ref::<ParameterError>().is_some());
        assert!(lines(report).is_empty());
        for handle in handles {
            assert!(matches!(
                handle.join().unwrap(),
                Err(FabricError::BroadcastAborted)
            ));
        }
    }
}
