//! Unit-to-unit wire protocol
//!
//! Every message crossing the fabric is serialized with MessagePack
//! (rmp-serde) and framed, so units never share in-memory values. Each
//! receiver decodes its own copy of exactly the bytes the sender produced.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator (rank 0)              Walker (rank 1..N)
//!     |                                  |
//!     |====== PARAMETERS (broadcast) ===>|
//!     |                                  |
//!     |                               (walk)
//!     |                                  |
//!     |<-------- WALK_COMPLETE ----------|
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use super::FabricError;
use crate::params::SimulationParameters;
use serde::{Deserialize, Serialize};

/// Protocol version
///
/// Carried in the parameter broadcast; walkers refuse a mismatched value.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest payload accepted by `deserialize_message`
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Run parameters (Coordinator → every Walker, broadcast)
    Parameters(ParametersMessage),

    /// Final walk outcome (Walker → Coordinator)
    ///
    /// The sender rank travels in the envelope, not in the payload.
    WalkComplete(WalkCompleteMessage),
}

/// Parameter broadcast payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    pub domain_size: i64,
    pub max_steps: i64,
}

impl ParametersMessage {
    pub fn new(params: &SimulationParameters) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            domain_size: params.domain_size,
            max_steps: params.max_steps,
        }
    }

    pub fn parameters(&self) -> SimulationParameters {
        SimulationParameters::new(self.domain_size, self.max_steps)
    }
}

/// Walk result payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkCompleteMessage {
    /// Moves made, including the absorbing move
    pub steps_taken: i64,
}

/// Serialize a message to a length-prefixed frame
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>, FabricError> {
    let msg_bytes = rmp_serde::to_vec(msg)?;

    let msg_len = u32::try_from(msg_bytes.len())
        .map_err(|_| FabricError::Frame(format!("message too large: {} bytes", msg_bytes.len())))?;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize one message from a frame
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize), FabricError> {
    if buf.len() < 4 {
        return Err(FabricError::Frame(format!(
            "buffer too small for message length (need 4 bytes, got {})",
            buf.len()
        )));
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if msg_len > MAX_MESSAGE_LEN {
        return Err(FabricError::Frame(format!(
            "message too large: {} bytes (max {})",
            msg_len, MAX_MESSAGE_LEN
        )));
    }

    if buf.len() < 4 + msg_len {
        return Err(FabricError::Frame(format!(
            "incomplete message (need {} bytes, got {})",
            4 + msg_len,
            buf.len()
        )));
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])?;

    Ok((msg, 4 + msg_len))
}
