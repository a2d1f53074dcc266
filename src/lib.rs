//! randwalk - bounded random walkers over a message-passing fabric
//!
//! A single coordinator unit distributes run parameters to a pool of walker
//! units. Each walker runs an independent one-dimensional random walk until it
//! leaves the domain or runs out of steps, then sends one result back. The
//! coordinator reports results in arrival order.
//!
//! # Architecture
//!
//! - **Fabric**: in-process point-to-point messaging plus a rendezvous broadcast
//! - **Parameters**: startup value resolution (stdin, then positional arguments)
//! - **Walker**: the bounded walk and its per-unit random step source
//! - **Coordinator**: order-agnostic fan-in of walker results
//! - **Unit**: role assignment and the thread-per-unit launcher

pub mod config;
pub mod coordinator;
pub mod fabric;
pub mod output;
pub mod params;
pub mod unit;
pub mod walker;

// Re-export commonly used types
pub use config::RunConfig;
pub use params::SimulationParameters;
pub use walker::WalkerResult;

/// Result type used throughout randwalk
pub type Result<T> = anyhow::Result<T>;
