//! Protocol errors

use thiserror::Error;

/// Errors that can occur during bus communication.
///
/// Timeouts and malformed responses are deliberately absent: a board that
/// does not answer, or answers with the wrong bytes, is the normal negative
/// outcome of an exchange and surfaces as a boolean `false`, never as an
/// error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Board address {0} is out of range 0..=127")]
    AddressOutOfRange(u8),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
