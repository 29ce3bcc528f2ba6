//! End-to-end protocol tests against a simulated bus.
//!
//! The simulated bus parses request frames exactly as the board firmware
//! does (resynchronizing on the two leading sync bytes) and answers for a
//! configurable set of board addresses, so discovery and reassignment run
//! over the same byte-level exchanges as on real hardware.

use std::collections::{BTreeSet, VecDeque};

use motorcord_core::discovery::CancelToken;
use motorcord_core::protocol::{
    BusClient, ByteChannel, ProtocolError, OP_PING, OP_PING_ACK, OP_SET_ID, OP_SET_ID_ACK,
    SYNC_BYTE,
};
use motorcord_core::reassign::{reassign, ReassignError};

/// In-memory bus with boards at a configurable set of addresses
struct SimulatedBus {
    boards: BTreeSet<u8>,
    /// Bytes queued for the host to read
    rx: VecDeque<u8>,
    /// Everything the host wrote, for asserting which frames went out
    written: Vec<u8>,
    /// Unconsumed request bytes still being parsed
    pending: Vec<u8>,
    pings_handled: usize,
    /// Cancel this token once the given number of pings have been handled
    cancel_after: Option<(usize, CancelToken)>,
    /// Inject these bytes as the response to the nth ping (1-based)
    noise_on_ping: Option<(usize, Vec<u8>)>,
}

impl SimulatedBus {
    fn new(boards: &[u8]) -> Self {
        Self {
            boards: boards.iter().copied().collect(),
            rx: VecDeque::new(),
            written: Vec::new(),
            pending: Vec::new(),
            pings_handled: 0,
            cancel_after: None,
            noise_on_ping: None,
        }
    }

    fn with_stale(boards: &[u8], stale: &[u8]) -> Self {
        let mut bus = Self::new(boards);
        bus.rx = stale.iter().copied().collect();
        bus
    }

    fn cancel_after(mut self, pings: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((pings, token));
        self
    }

    fn noise_on_ping(mut self, nth: usize, bytes: &[u8]) -> Self {
        self.noise_on_ping = Some((nth, bytes.to_vec()));
        self
    }

    fn handle_ping(&mut self, address: u8) {
        self.pings_handled += 1;
        if let Some((nth, bytes)) = &self.noise_on_ping {
            if *nth == self.pings_handled {
                let bytes = bytes.clone();
                self.rx.extend(bytes);
                return;
            }
        }
        if self.boards.contains(&address) {
            self.rx.push_back(OP_PING_ACK);
            self.rx.push_back(address);
        }
        if let Some((after, token)) = &self.cancel_after {
            if self.pings_handled >= *after {
                token.cancel();
            }
        }
    }

    fn handle_set_id(&mut self, old: u8, new: u8) {
        if self.boards.remove(&old) {
            self.boards.insert(new);
            self.rx.push_back(OP_SET_ID_ACK);
            self.rx.push_back(new);
        }
    }

    fn process(&mut self) {
        loop {
            if self.pending.len() >= 2
                && self.pending[0] == SYNC_BYTE
                && self.pending[1] == SYNC_BYTE
            {
                match self.pending.get(2).copied() {
                    Some(OP_PING) if self.pending.len() >= 4 => {
                        let address = self.pending[3];
                        self.pending.drain(..4);
                        self.handle_ping(address);
                    }
                    Some(OP_SET_ID) if self.pending.len() >= 5 => {
                        let old = self.pending[3];
                        let new = self.pending[4];
                        self.pending.drain(..5);
                        self.handle_set_id(old, new);
                    }
                    // Incomplete frame, wait for more bytes
                    _ => return,
                }
            } else if !self.pending.is_empty() {
                // Firmware resynchronizes by discarding until sync bytes
                self.pending.remove(0);
            } else {
                return;
            }
        }
    }

    /// Number of set_id frames the host put on the wire
    fn set_id_frames_sent(&self) -> usize {
        self.written
            .windows(3)
            .filter(|w| w == &[SYNC_BYTE, SYNC_BYTE, OP_SET_ID])
            .count()
    }
}

impl ByteChannel for SimulatedBus {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.written.extend_from_slice(data);
        self.pending.extend_from_slice(data);
        self.process();
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        Ok(self.rx.pop_front())
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        Ok(self.rx.pop_front())
    }
}

#[test]
fn test_ping_true_only_at_board_address() {
    let mut client = BusClient::new(SimulatedBus::new(&[42]));
    for address in 0..=127u8 {
        assert_eq!(
            client.ping(address).unwrap(),
            address == 42,
            "ping({address})"
        );
    }
}

#[test]
fn test_reassign_moves_board() {
    let mut client = BusClient::new(SimulatedBus::new(&[5]));
    reassign(&mut client, 5, 9).unwrap();

    // The board now answers at 9 and no longer at 5
    assert!(client.ping(9).unwrap());
    assert!(!client.ping(5).unwrap());
}

#[test]
fn test_reassign_collision_never_sends_set_id() {
    let mut client = BusClient::new(SimulatedBus::new(&[5, 9]));
    let err = reassign(&mut client, 5, 9).unwrap_err();
    assert!(matches!(err, ReassignError::AddressInUse(9)));
    assert_eq!(err.to_string(), "address 9 already in use");
    assert_eq!(client.channel().set_id_frames_sent(), 0);
}

#[test]
fn test_reassign_without_board_at_old_address() {
    let mut client = BusClient::new(SimulatedBus::new(&[]));
    let err = reassign(&mut client, 5, 9).unwrap_err();
    assert!(matches!(err, ReassignError::NoBoardAtOldAddress(5)));
}

#[test]
fn test_reassign_rejects_out_of_range_before_writing() {
    let mut client = BusClient::new(SimulatedBus::new(&[5]));
    let err = reassign(&mut client, 5, 200).unwrap_err();
    assert!(matches!(
        err,
        ReassignError::Protocol(ProtocolError::AddressOutOfRange(200))
    ));
    // The old address must not have been probed either
    assert!(client.channel().written.is_empty());
}

#[test]
fn test_sweep_finds_all_boards_in_order() {
    let mut client = BusClient::new(SimulatedBus::new(&[3, 17, 126]));
    let found: Vec<u8> = client
        .sweep(CancelToken::new())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![3, 17, 126]);
}

#[test]
fn test_sweep_survives_stale_input() {
    // Garbage left over from a previous session is flushed, not decoded
    let mut client = BusClient::new(SimulatedBus::with_stale(&[7], &[0xE0, 0x07, 0xFF]));
    let found: Vec<u8> = client
        .sweep(CancelToken::new())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![7]);
}

#[test]
fn test_sweep_excludes_partial_echo() {
    // A noise burst that looks like a ping ack for the wrong address must
    // not count as a board; the 21st ping probes address 20
    let mut client =
        BusClient::new(SimulatedBus::new(&[3, 17, 126]).noise_on_ping(21, &[OP_PING_ACK, 19]));
    let found: Vec<u8> = client
        .sweep(CancelToken::new())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![3, 17, 126]);
}

#[test]
fn test_sweep_cancellation_stops_at_address_boundary() {
    let cancel = CancelToken::new();
    // Token flips once address 50 has been probed (the 51st ping)
    let bus = SimulatedBus::new(&[3, 17, 126]).cancel_after(51, cancel.clone());
    let mut client = BusClient::new(bus);

    let found: Vec<u8> = client.sweep(cancel).collect::<Result<_, _>>().unwrap();
    assert_eq!(found, vec![3, 17]);
    // No probes were issued past address 50
    assert_eq!(client.channel().pings_handled, 51);
}

#[test]
fn test_sweep_reports_progress_per_address() {
    let mut client = BusClient::new(SimulatedBus::new(&[3]));
    let mut probed = Vec::new();
    let found: Vec<u8> = client
        .sweep(CancelToken::new())
        .with_progress(|address| probed.push(address))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![3]);
    assert_eq!(probed, (0..=127u8).collect::<Vec<_>>());
}
