//! Discovery sweep
//!
//! Enumerates responding boards across the full bus address space. The
//! sweep holds no protocol knowledge of its own: it drives the client's
//! ping across addresses 0..=127 and yields each responder as it is found,
//! so callers can report progress without buffering the whole range.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::protocol::{BusClient, ByteChannel, ProtocolError, MAX_BOARD_ID};

/// Cooperative cancellation flag for a running sweep.
///
/// Clones share the same flag. Cancellation is checked between whole
/// exchanges only; an in-flight exchange always runs to its timeout or
/// completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from another thread or a signal
    /// handler.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Lazy iterator over the addresses of responding boards.
///
/// Probes every address in ascending order; an address only counts when
/// the board completes a full valid echo, so bus noise cannot produce a
/// false positive. A channel failure is yielded once and ends the sweep.
/// Not restartable: a fresh sweep re-probes from 0.
pub struct Sweep<'a, C: ByteChannel> {
    client: &'a mut BusClient<C>,
    // one past MAX_BOARD_ID marks exhaustion
    next_address: u16,
    cancel: CancelToken,
    progress: Option<Box<dyn FnMut(u8) + 'a>>,
    failed: bool,
}

impl<'a, C: ByteChannel> Sweep<'a, C> {
    /// Start a sweep from address 0
    pub fn new(client: &'a mut BusClient<C>, cancel: CancelToken) -> Self {
        Self {
            client,
            next_address: 0,
            cancel,
            progress: None,
            failed: false,
        }
    }

    /// Install a callback invoked with each address just before it is
    /// probed, for per-address progress reporting.
    pub fn with_progress(mut self, f: impl FnMut(u8) + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }
}

impl<C: ByteChannel> Iterator for Sweep<'_, C> {
    type Item = Result<u8, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.next_address <= MAX_BOARD_ID as u16 {
            if self.cancel.is_cancelled() {
                info!(next = self.next_address, "sweep cancelled");
                self.next_address = MAX_BOARD_ID as u16 + 1;
                return None;
            }
            let address = self.next_address as u8;
            self.next_address += 1;
            if let Some(progress) = self.progress.as_mut() {
                progress(address);
            }
            match self.client.ping(address) {
                Ok(true) => {
                    debug!(address, "board responded");
                    return Some(Ok(address));
                }
                Ok(false) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<C: ByteChannel> BusClient<C> {
    /// Probe every address on the bus, yielding responders as they are found
    pub fn sweep(&mut self, cancel: CancelToken) -> Sweep<'_, C> {
        Sweep::new(self, cancel)
    }
}
