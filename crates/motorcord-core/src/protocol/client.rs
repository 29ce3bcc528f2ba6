//! Protocol client
//!
//! Executes single request/response exchanges against the bus. Every call
//! is one best-effort attempt: the protocol has no retry or ack-of-ack
//! mechanism, so a timeout is the normal "no board at this address"
//! outcome rather than an error.

use std::time::Duration;
use tracing::{debug, trace};

use super::channel::{ByteChannel, SerialChannel};
use super::frame::{decode_ping_response, decode_set_id_response, Command, Response};
use super::serial::{clear_buffers, configure_port, open_port};
use super::{
    ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, MAX_BOARD_ID, OP_PING_ACK, OP_SET_ID_ACK,
};

/// Bus connection configuration
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-byte response timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            port_name: "/dev/ttyUSB1".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Client for the sensorimotor bus protocol.
///
/// Owns the byte channel for the lifetime of the bus session. The channel
/// is an exclusively-held resource: exchanges are strictly sequential,
/// write then read, with no pipelining.
pub struct BusClient<C: ByteChannel> {
    channel: C,
}

impl BusClient<SerialChannel> {
    /// Open and configure the serial port and build a client on top of it
    pub fn open(config: &BusConfig) -> Result<Self, ProtocolError> {
        let mut port = open_port(&config.port_name, Some(config.baud_rate))?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        debug!(port = %config.port_name, baud = config.baud_rate, "bus opened");
        let timeout = Duration::from_millis(config.timeout_ms);
        Ok(Self::new(SerialChannel::new(port, timeout)))
    }
}

impl<C: ByteChannel> BusClient<C> {
    /// Build a client over an already-open channel
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Borrow the underlying channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Drain and discard any bytes pending on the channel.
    ///
    /// A previous exchange may have left unread trailing bytes behind;
    /// anything still buffered would be misread as the next response, so
    /// this runs before every request. Terminates as soon as the channel
    /// reports no byte available now.
    fn flush_stale_input(&mut self) -> Result<(), ProtocolError> {
        let mut discarded = 0usize;
        while let Some(byte) = self.channel.poll_byte()? {
            trace!(byte, "discarding stale byte");
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "flushed stale input");
        }
        Ok(())
    }

    /// Probe for a board at `address`.
    ///
    /// Returns `Ok(true)` only when a board answers with the ping ack
    /// opcode and echoes the probed address back. A timeout, a wrong
    /// opcode or a mismatched echo all return `Ok(false)`.
    pub fn ping(&mut self, address: u8) -> Result<bool, ProtocolError> {
        check_address(address)?;
        self.flush_stale_input()?;
        self.channel
            .write_bytes(&Command::Ping { address }.encode())?;

        let opcode = self.channel.read_byte()?;
        if opcode != Some(OP_PING_ACK) {
            trace!(address, ?opcode, "no ping ack");
            return Ok(false);
        }
        let echo = self.channel.read_byte()?;
        match decode_ping_response(opcode, echo) {
            Response::PingAck { address: echoed } => {
                let ok = echoed == address;
                debug!(address, echoed, ok, "ping answered");
                Ok(ok)
            }
            _ => Ok(false),
        }
    }

    /// Tell the board at `old` to adopt address `new`.
    ///
    /// On success the board's persistent address changes, so callers must
    /// verify that `new` is unclaimed first (see [`crate::reassign`]).
    /// Returns `Ok(true)` only when the board acks and echoes the new
    /// address.
    pub fn set_id(&mut self, old: u8, new: u8) -> Result<bool, ProtocolError> {
        check_address(old)?;
        check_address(new)?;
        self.flush_stale_input()?;
        self.channel.write_bytes(
            &Command::SetId {
                old_address: old,
                new_address: new,
            }
            .encode(),
        )?;

        let opcode = self.channel.read_byte()?;
        if opcode != Some(OP_SET_ID_ACK) {
            debug!(old, new, ?opcode, "no set_id ack");
            return Ok(false);
        }
        let echo = self.channel.read_byte()?;
        match decode_set_id_response(opcode, echo) {
            Response::SetIdAck { new_address } => {
                let ok = new_address == new;
                debug!(old, new, new_address, ok, "set_id answered");
                Ok(ok)
            }
            _ => Ok(false),
        }
    }
}

/// Reject addresses outside the bus address space before any bytes hit the
/// wire.
pub(crate) fn check_address(address: u8) -> Result<(), ProtocolError> {
    if address > MAX_BOARD_ID {
        return Err(ProtocolError::AddressOutOfRange(address));
    }
    Ok(())
}
