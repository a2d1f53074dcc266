//! Walker implementation
//!
//! A walker is one unit's bounded random walk. It starts at position 0 and
//! moves one step left or right per tick until it is absorbed at a domain
//! boundary or exhausts its step budget.
//!
//! # Lifecycle
//!
//! 1. **Parameters**: block on the fabric broadcast from rank 0
//! 2. **Walk**: `Walker::walk()` runs to a terminal state
//! 3. **Report**: exactly one `WalkComplete` message to rank 0
//!
//! # Example
//!
//! ```
//! use randwalk::walker::{Walker, WalkOutcome, step::UniformStep};
//! use randwalk::SimulationParameters;
//!
//! let params = SimulationParameters::new(1, 100);
//! let walk = Walker::new(1, params, UniformStep::with_seed(7)).walk();
//!
//! // Any first move leaves [-1, 1]
//! assert_eq!(walk.outcome, WalkOutcome::Absorbed);
//! assert_eq!(walk.result.steps_taken, 1);
//! ```

pub mod step;

use crate::fabric::{
    Endpoint, FabricError, Message, Rank, WalkCompleteMessage, PROTOCOL_VERSION, ROOT,
};
use crate::params::SimulationParameters;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use step::{unit_seed, StepSource, UniformStep};
use tracing::debug;

/// Outcome of one walker, as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerResult {
    /// Rank of the walker that produced the result
    pub source: Rank,

    /// Moves made, including the absorbing move
    pub steps_taken: i64,
}

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Position reached or crossed a boundary
    Absorbed,
    /// Step budget ran out inside the domain
    Exhausted,
}

/// Walker-local state, never observed outside the walker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkerState {
    pub position: i64,
    pub steps_so_far: i64,
}

/// A finished walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walk {
    pub result: WalkerResult,
    pub outcome: WalkOutcome,
    pub final_position: i64,
}

/// A single bounded random walk
pub struct Walker<S: StepSource = UniformStep> {
    id: Rank,
    params: SimulationParameters,
    steps: S,
    state: WalkerState,
}

impl<S: StepSource> Walker<S> {
    pub fn new(id: Rank, params: SimulationParameters, steps: S) -> Self {
        Self {
            id,
            params,
            steps,
            state: WalkerState::default(),
        }
    }

    /// Run the walk to a terminal state
    ///
    /// Makes at most `max_steps` moves. Absorption is checked in the same
    /// tick as the move, so a walker absorbed on its first move reports 1.
    pub fn walk(mut self) -> Walk {
        let outcome = loop {
            if self.state.steps_so_far >= self.params.max_steps {
                break WalkOutcome::Exhausted;
            }

            self.state.position += self.steps.next_step();
            self.state.steps_so_far += 1;

            if self.params.is_outside(self.state.position) {
                break WalkOutcome::Absorbed;
            }
        };

        Walk {
            result: WalkerResult {
                source: self.id,
                steps_taken: self.state.steps_so_far,
            },
            outcome,
            final_position: self.state.position,
        }
    }
}

/// Run the walker role on `endpoint`
///
/// Returns `None` when rank 0 aborted the parameter broadcast; in that case
/// no walk is made and nothing is sent.
pub fn run(endpoint: Endpoint, seed_base: Option<u64>) -> Result<Option<Walk>> {
    let rank = endpoint.rank();

    let params = match endpoint.broadcast(None) {
        Ok(Message::Parameters(msg)) => {
            if msg.protocol_version != PROTOCOL_VERSION {
                anyhow::bail!(
                    "Protocol version mismatch on walker {}: expected {}, got {}",
                    rank,
                    PROTOCOL_VERSION,
                    msg.protocol_version
                );
            }
            msg.parameters()
        }
        Ok(other) => {
            anyhow::bail!("Walker {} expected PARAMETERS, got {:?}", rank, other);
        }
        Err(FabricError::BroadcastAborted) => {
            debug!(rank, "parameter broadcast aborted, not walking");
            return Ok(None);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Walker {} failed to receive parameters", rank));
        }
    };

    let seed = unit_seed(seed_base, rank);
    let walk = Walker::new(rank, params, UniformStep::with_seed(seed)).walk();
    debug!(
        rank,
        steps = walk.result.steps_taken,
        position = walk.final_position,
        outcome = ?walk.outcome,
        "walk finished"
    );

    let msg = Message::WalkComplete(WalkCompleteMessage {
        steps_taken: walk.result.steps_taken,
    });
    endpoint
        .send(ROOT, &msg)
        .with_context(|| format!("Walker {} failed to send its result", rank))?;

    Ok(Some(walk))
}
