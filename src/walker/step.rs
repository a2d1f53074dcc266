//! Random step sources
//!
//! A walker draws each move from a `StepSource`. The production source is a
//! fair coin over {-1, +1} backed by xoshiro256++, one generator per walker.

use crate::fabric::Rank;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of unit moves
///
/// Sources must be `Send` so a walker can be moved onto its own thread. Each
/// walker owns its source; sources are never shared.
pub trait StepSource: Send {
    /// Next move, either -1 or +1
    fn next_step(&mut self) -> i64;
}

/// Fair coin over {-1, +1}
pub struct UniformStep {
    rng: Xoshiro256PlusPlus,
}

impl UniformStep {
    /// Create a step source with a specific seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl StepSource for UniformStep {
    #[inline(always)]
    fn next_step(&mut self) -> i64 {
        if self.rng.gen_bool(0.5) {
            1
        } else {
            -1
        }
    }
}

/// Seed for the walker at `rank`
///
/// Mixes the rank into `base` so walkers sharing a base never share a stream.
/// Without a base the wall clock supplies one.
pub fn unit_seed(base: Option<u64>, rank: Rank) -> u64 {
    let base = base.unwrap_or_else(clock_seed);
    base ^ (rank as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
