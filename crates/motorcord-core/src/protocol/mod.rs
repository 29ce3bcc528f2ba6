//! Sensorimotor bus protocol
//!
//! Implements the framed request/response protocol spoken by sensorimotor
//! boards on the shared RS485 bus: address probe (ping) and address
//! reassignment (set_id).
//!
//! Every request frame starts with two sync bytes followed by an opcode and
//! a one or two byte payload. There is no length field and no checksum; a
//! response is whatever the bus produces next after a request, which is why
//! the client drains stale input before every exchange.

mod channel;
mod client;
mod error;
mod frame;
pub mod serial;

pub use channel::{ByteChannel, SerialChannel};
pub use client::{BusClient, BusConfig};
pub use error::ProtocolError;
pub use frame::{decode_ping_response, decode_set_id_response, Command, Response};
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo};

pub(crate) use client::check_address;

/// Value of each of the two leading synchronization bytes.
pub const SYNC_BYTE: u8 = 0xFF;

/// Ping request opcode.
pub const OP_PING: u8 = 0xE0;

/// Ping response opcode.
pub const OP_PING_ACK: u8 = 0xE0;

/// Set-id request opcode.
pub const OP_SET_ID: u8 = 0x70;

/// Set-id response opcode (request opcode + 1).
pub const OP_SET_ID_ACK: u8 = 0x71;

/// Highest valid board address on the bus.
pub const MAX_BOARD_ID: u8 = 127;

/// Default baud rate of the sensorimotor RS485 adapter.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Default per-byte response timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 100;
