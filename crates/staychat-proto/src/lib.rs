//! Wire protocol for the staychat message broker.
//!
//! The broker speaks a STOMP-1.2 subset as UTF-8 text frames over a
//! WebSocket: a command line, header lines, a blank line, then a
//! NUL-terminated body. Bodies on chat topics are JSON records.
//!
//! # Components
//!
//! - [`Frame`]: text frame with command, headers and body
//! - [`Command`]: the command subset the broker understands
//! - [`ChatEvent`]: decoded JSON body of an inbound topic frame
//! - [`destination`]: topic and publish address naming per room
//!
//! The frame layer is a pure codec. It validates syntax only; whether a
//! frame makes sense in the current session state is the session state
//! machine's concern.

mod error;
mod frame;
mod payload;

pub mod destination;

pub use error::ProtocolError;
pub use frame::{Command, Frame, headers};
pub use payload::{ChatEvent, ChatMessage, OutboundMessage, ReadReceipt};

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Room identifier as assigned by the booking platform.
pub type RoomId = u64;

/// User identifier as assigned by the booking platform.
pub type UserId = u64;
