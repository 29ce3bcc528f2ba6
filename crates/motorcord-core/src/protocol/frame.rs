//! Frame encoding/decoding
//!
//! Stateless translation between commands and wire bytes, and between raw
//! response bytes and decoded responses.
//!
//! Request frame format:
//! - 2 bytes: sync (0xFF 0xFF)
//! - 1 byte: opcode
//! - 1 byte (ping) or 2 bytes (set_id): address payload
//!
//! Responses carry no sync bytes: an ack opcode followed by an echoed
//! address. The firmware protocol has no checksum, so the echo is the sole
//! correctness check.

use super::{OP_PING, OP_PING_ACK, OP_SET_ID, OP_SET_ID_ACK, SYNC_BYTE};

/// A request that can be sent to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Probe for a board at `address`
    Ping {
        /// Address to probe, 0..=127
        address: u8,
    },

    /// Tell the board at `old_address` to adopt `new_address`
    SetId {
        /// Current address of the board, 0..=127
        old_address: u8,
        /// Address the board should adopt, 0..=127
        new_address: u8,
    },
}

impl Command {
    /// Encode the command into its wire frame.
    ///
    /// Addresses must already be validated to 0..=127; the codec itself does
    /// not check range.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::Ping { address } => vec![SYNC_BYTE, SYNC_BYTE, OP_PING, address],
            Command::SetId {
                old_address,
                new_address,
            } => vec![SYNC_BYTE, SYNC_BYTE, OP_SET_ID, old_address, new_address],
        }
    }
}

/// A decoded board response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// A board acknowledged a ping, echoing its address
    PingAck {
        /// Address echoed by the board
        address: u8,
    },

    /// A board acknowledged a set_id, echoing the address it adopted
    SetIdAck {
        /// New address echoed by the board
        new_address: u8,
    },

    /// Timeout, or a byte that does not match the expected ack opcode
    NoResponse,
}

/// Decode the two bytes read back after a ping request.
///
/// `None` in either position means the read timed out.
pub fn decode_ping_response(opcode: Option<u8>, address: Option<u8>) -> Response {
    match (opcode, address) {
        (Some(OP_PING_ACK), Some(address)) => Response::PingAck { address },
        _ => Response::NoResponse,
    }
}

/// Decode the two bytes read back after a set_id request.
pub fn decode_set_id_response(opcode: Option<u8>, address: Option<u8>) -> Response {
    match (opcode, address) {
        (Some(OP_SET_ID_ACK), Some(new_address)) => Response::SetIdAck { new_address },
        _ => Response::NoResponse,
    }
}
