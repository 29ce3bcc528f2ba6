//! Byte channel abstraction
//!
//! The bus hangs off a duplex byte stream with a bounded read timeout. The
//! client only ever needs three operations on it, so they live behind a
//! small trait and tests drive the protocol against an in-memory channel
//! instead of real hardware.

use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use super::ProtocolError;

/// Duplex byte stream the bus protocol runs over
pub trait ByteChannel {
    /// Write raw bytes to the bus
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Read one byte, blocking up to the channel's response timeout.
    ///
    /// Returns `Ok(None)` when the timeout expires without a byte arriving.
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError>;

    /// Read one byte only if one is already pending, with zero additional
    /// wait. Returns `Ok(None)` when the channel reports nothing available
    /// right now.
    fn poll_byte(&mut self) -> Result<Option<u8>, ProtocolError>;
}

/// Serial port implementation of [`ByteChannel`].
///
/// Reads poll `bytes_to_read()` against a deadline instead of issuing
/// blocking reads, which behave unreliably on Linux USB serial adapters.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialChannel {
    const POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Wrap an already-open serial port with the given response timeout
    pub fn new(port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    fn available(&mut self) -> Result<u32, ProtocolError> {
        self.port
            .bytes_to_read()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }

    fn read_one(&mut self) -> Result<u8, ProtocolError> {
        let mut buf = [0u8; 1];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => return Err(ProtocolError::SerialError("serial port closed".into())),
                Ok(_) => return Ok(buf[0]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ByteChannel for SerialChannel {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        // write_all hands the bytes to the kernel tty buffer; at bus baud
        // rates a frame is on the wire well before the response timeout
        self.port.write_all(data)?;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.available()? > 0 {
                return self.read_one().map(Some);
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Self::POLL_INTERVAL);
        }
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        if self.available()? == 0 {
            return Ok(None);
        }
        self.read_one().map(Some)
    }
}
