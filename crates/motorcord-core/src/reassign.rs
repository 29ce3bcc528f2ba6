//! Address reassignment
//!
//! Moves a board from one bus address to another, refusing to overwrite an
//! address that is already claimed by another board. The protocol itself
//! does not enforce address uniqueness, so the collision check here is the
//! only thing standing between a reassignment and two boards answering at
//! the same address.

use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::{check_address, BusClient, ByteChannel, ProtocolError};

/// Why a reassignment did not complete
#[derive(Error, Debug)]
pub enum ReassignError {
    /// Nothing answered a ping at the old address
    #[error("no board at old address {0}")]
    NoBoardAtOldAddress(u8),

    /// A board already answers at the requested new address
    #[error("address {0} already in use")]
    AddressInUse(u8),

    /// The board did not acknowledge or correctly echo the set_id command
    #[error("board did not accept the new address")]
    SetIdRejected,

    /// Out-of-range address or channel failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Move the board at `old` to address `new`.
///
/// Sequence: verify a board answers at `old`, verify nothing answers at
/// `new`, then commit with set_id. The commit never runs while `new` is
/// occupied. The set_id echo is the commit verification; no follow-up ping
/// is sent and no rollback is attempted on failure, so after an error the
/// board is wherever it last answered.
pub fn reassign<C: ByteChannel>(
    client: &mut BusClient<C>,
    old: u8,
    new: u8,
) -> Result<(), ReassignError> {
    // Both addresses are validated before any frame hits the wire
    check_address(old)?;
    check_address(new)?;

    if !client.ping(old)? {
        return Err(ReassignError::NoBoardAtOldAddress(old));
    }
    debug!(old, "board present at old address");

    if client.ping(new)? {
        return Err(ReassignError::AddressInUse(new));
    }
    debug!(new, "new address is free");

    if !client.set_id(old, new)? {
        return Err(ReassignError::SetIdRejected);
    }
    info!(old, new, "board address reassigned");
    Ok(())
}
