//! # motorcord-core
//!
//! Core library for discovering and renumbering sensorimotor controller
//! boards attached to a shared RS485 bus.
//!
//! The bus speaks a tiny framed request/response protocol with two
//! operations: an address probe (ping) and an address reassignment
//! (set_id). On top of those this crate provides a full-bus discovery
//! sweep and a collision-checked reassignment sequence.
//!
//! ## Example
//!
//! ```rust,ignore
//! use motorcord_core::discovery::CancelToken;
//! use motorcord_core::protocol::{BusClient, BusConfig};
//!
//! let mut client = BusClient::open(&BusConfig::default())?;
//! for found in client.sweep(CancelToken::new()) {
//!     println!("board {} responded", found?);
//! }
//! ```

#![warn(missing_docs)]

pub mod discovery;
pub mod protocol;
pub mod reassign;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::discovery::{CancelToken, Sweep};
    pub use crate::protocol::{
        BusClient, BusConfig, ByteChannel, Command, ProtocolError, Response, SerialChannel,
    };
    pub use crate::reassign::{reassign, ReassignError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
