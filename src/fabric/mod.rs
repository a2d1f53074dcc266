//! In-process message fabric
//!
//! This module connects a fixed group of units that share no memory. Each unit
//! owns an `Endpoint` and talks to the others only through it.
//!
//! # Architecture
//!
//! - **Inbox**: every rank has one unbounded inbox; any rank may send to it.
//!   The receiver learns the sender rank from the envelope.
//! - **Broadcast**: rank 0 owns one rendezvous (zero-capacity) channel per
//!   other rank. A root broadcast returns only after every rank has taken
//!   the value. Dropping the root endpoint without broadcasting aborts it.
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing

pub mod protocol;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// Re-export key types
pub use protocol::{
    Message,
    ParametersMessage,
    WalkCompleteMessage,
    PROTOCOL_VERSION,
};

use protocol::{deserialize_message, serialize_message};

/// Position of a unit in the execution group
pub type Rank = usize;

/// Rank that owns the broadcast and collects results
pub const ROOT: Rank = 0;

/// Fabric failures
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("rank {dest} is outside the fabric (size {size})")]
    UnknownRank { dest: Rank, size: usize },

    #[error("rank {dest} is no longer receiving")]
    PeerGone { dest: Rank },

    #[error("inbox of rank {rank} is closed")]
    InboxClosed { rank: Rank },

    #[error("no message arrived within {0:?}")]
    Timeout(Duration),

    #[error("broadcast aborted before a value was sent")]
    BroadcastAborted,

    #[error("rank 0 must supply the broadcast value")]
    MissingBroadcastValue,

    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("malformed frame: {0}")]
    Frame(String),
}

/// Encoded message in flight, tagged with its sender
struct Frame {
    source: Rank,
    bytes: Vec<u8>,
}

/// Decoded message together with the rank that sent it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub message: Message,
}

/// A fixed-size group of connected endpoints
pub struct Fabric {
    endpoints: Vec<Endpoint>,
}

impl Fabric {
    /// Create a fabric with `size` ranks, `0..size`
    pub fn new(size: usize) -> Self {
        let (inbox_tx, inbox_rx): (Vec<_>, Vec<_>) =
            (0..size).map(|_| channel::unbounded::<Frame>()).unzip();
        let peers: Arc<[Sender<Frame>]> = inbox_tx.into();

        let mut broadcast_out = Vec::with_capacity(size.saturating_sub(1));
        let mut broadcast_in: Vec<Option<Receiver<Vec<u8>>>> = Vec::with_capacity(size);
        broadcast_in.push(None);
        for _ in 1..size {
            let (tx, rx) = channel::bounded(0);
            broadcast_out.push(tx);
            broadcast_in.push(Some(rx));
        }

        let endpoints = inbox_rx
            .into_iter()
            .zip(broadcast_in)
            .enumerate()
            .map(|(rank, (inbox, broadcast_in))| Endpoint {
                rank,
                size,
                inbox,
                peers: Arc::clone(&peers),
                broadcast_out: if rank == ROOT {
                    std::mem::take(&mut broadcast_out)
                } else {
                    Vec::new()
                },
                broadcast_in,
            })
            .collect();

        Self { endpoints }
    }

    /// Hand out the endpoints, ordered by rank
    pub fn into_endpoints(self) -> Vec<Endpoint> {
        self.endpoints
    }
}

/// One unit's connection to the fabric
pub struct Endpoint {
    rank: Rank,
    size: usize,
    inbox: Receiver<Frame>,
    peers: Arc<[Sender<Frame>]>,
    broadcast_out: Vec<Sender<Vec<u8>>>,
    broadcast_in: Option<Receiver<Vec<u8>>>,
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the fabric
    pub fn size(&self) -> usize {
        self.size
    }

    /// Send `message` to `dest`
    pub fn send(&self, dest: Rank, message: &Message) -> Result<(), FabricError> {
        let tx = self.peers.get(dest).ok_or(FabricError::UnknownRank {
            dest,
            size: self.size,
        })?;
        let bytes = serialize_message(message)?;

        tx.send(Frame {
            source: self.rank,
            bytes,
        })
        .map_err(|_| FabricError::PeerGone { dest })
    }

    /// Block until a message from any rank arrives
    pub fn recv_any(&self) -> Result<Envelope, FabricError> {
        let frame = self
            .inbox
            .recv()
            .map_err(|_| FabricError::InboxClosed { rank: self.rank })?;
        open(frame)
    }

    /// Like `recv_any`, giving up after `timeout`
    pub fn recv_any_timeout(&self, timeout: Duration) -> Result<Envelope, FabricError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(frame) => open(frame),
            Err(RecvTimeoutError::Timeout) => Err(FabricError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(FabricError::InboxClosed { rank: self.rank })
            }
        }
    }

    /// Collective broadcast rooted at rank 0
    ///
    /// Rank 0 passes `Some(value)` and blocks until every other rank has
    /// taken it. Other ranks pass `None` and block until the value arrives.
    /// Every rank returns the value as decoded from the same bytes.
    pub fn broadcast(&self, value: Option<&Message>) -> Result<Message, FabricError> {
        if self.rank == ROOT {
            let message = value.ok_or(FabricError::MissingBroadcastValue)?;
            let bytes = serialize_message(message)?;

            for (offset, tx) in self.broadcast_out.iter().enumerate() {
                tx.send(bytes.clone())
                    .map_err(|_| FabricError::PeerGone { dest: offset + 1 })?;
            }

            let (message, _) = deserialize_message(&bytes)?;
            Ok(message)
        } else {
            let rx = self
                .broadcast_in
                .as_ref()
                .ok_or(FabricError::BroadcastAborted)?;
            let bytes = rx.recv().map_err(|_| FabricError::BroadcastAborted)?;
            let (message, _) = deserialize_message(&bytes)?;
            Ok(message)
        }
    }
}

fn open(frame: Frame) -> Result<Envelope, FabricError> {
    let (message, _) = deserialize_message(&frame.bytes)?;
    Ok(Envelope {
        source: frame.source,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimulationParameters;
    use std::thread;

    fn params_message(domain_size: i64, max_steps: i64) -> Message {
        Message::Parameters(ParametersMessage::new(&SimulationParameters::new(
            domain_size,
            max_steps,
        )))
    }

    fn done(steps_taken: i64) -> Message {
        Message::WalkComplete(WalkCompleteMessage { steps_taken })
    }

    #[test]
    fn test_endpoints_are_ranked() {
        let endpoints = Fabric::new(4).into_endpoints();
        assert_eq!(endpoints.len(), 4);

        for (i, endpoint) in endpoints.iter().enumerate() {
            assert_eq!(endpoint.rank(), i);
            assert_eq!(endpoint.size(), 4);
        }
    }

    #[test]
    fn test_source_comes_from_envelope() {
        let mut endpoints = Fabric::new(3).into_endpoints();
        let two = endpoints.pop().unwrap();
        let _one = endpoints.pop().unwrap();
        let root = endpoints.pop().unwrap();

        two.send(ROOT, &done(9)).unwrap();

        let envelope = root.recv_any().unwrap();
        assert_eq!(envelope.source, 2);
        assert_eq!(envelope.message, done(9));
    }

    #[test]
    fn test_recv_any_from_many_senders() {
        let mut endpoints = Fabric::new(6).into_endpoints();
        let root = endpoints.remove(0);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| {
                thread::spawn(move || {
                    let steps = endpoint.rank() as i64 * 10;
                    endpoint.send(ROOT, &done(steps)).unwrap();
                })
            })
            .collect();

        let mut seen: Vec<Rank> = (0..5)
            .map(|_| {
                let envelope = root.recv_any().unwrap();
                assert_eq!(envelope.message, done(envelope.source as i64 * 10));
                envelope.source
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_broadcast_reaches_every_rank_identically() {
        let mut endpoints = Fabric::new(8).into_endpoints();
        let root = endpoints.remove(0);
        let value = params_message(123_456, 789);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| thread::spawn(move || endpoint.broadcast(None).unwrap()))
            .collect();

        let at_root = root.broadcast(Some(&value)).unwrap();
        assert_eq!(at_root, value);

        for handle in handles {
            assert_eq!(handle.join().unwrap(), value);
        }
    }

    #[test]
    fn test_broadcast_single_rank() {
        let root = Fabric::new(1).into_endpoints().remove(0);
        let value = params_message(1, 1);
        assert_eq!(root.broadcast(Some(&value)).unwrap(), value);
    }

    #[test]
    fn test_root_must_supply_value() {
        let root = Fabric::new(1).into_endpoints().remove(0);
        assert!(matches!(
            root.broadcast(None),
            Err(FabricError::MissingBroadcastValue)
        ));
    }

    #[test]
    fn test_dropped_root_aborts_broadcast() {
        let mut endpoints = Fabric::new(3).into_endpoints();
        let root = endpoints.remove(0);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| thread::spawn(move || endpoint.broadcast(None)))
            .collect();

        drop(root);

        for handle in handles {
            assert!(matches!(
                handle.join().unwrap(),
                Err(FabricError::BroadcastAborted)
            ));
        }
    }

    #[test]
    fn test_unknown_rank() {
        let root = Fabric::new(2).into_endpoints().remove(0);
        assert!(matches!(
            root.send(5, &done(1)),
            Err(FabricError::UnknownRank { dest: 5, size: 2 })
        ));
    }

    #[test]
    fn test_send_to_dropped_rank() {
        let mut endpoints = Fabric::new(2).into_endpoints();
        let one = endpoints.pop().unwrap();
        let root = endpoints.pop().unwrap();
        drop(root);

        assert!(matches!(
            one.send(ROOT, &done(1)),
            Err(FabricError::PeerGone { dest: 0 })
        ));
    }

    #[test]
    fn test_recv_timeout() {
        let endpoints = Fabric::new(2).into_endpoints();
        let result = endpoints[0].recv_any_timeout(Duration::from_millis(20));
        assert!(matches!(result, Err(FabricError::Timeout(_))));
    }
}
