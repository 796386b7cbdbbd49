//! Tokio driver for the staychat session core.
//!
//! Wraps the sans-IO [`staychat_core::ChatSession`] with a transport,
//! timers and an async surface:
//!
//! - [`ChatClient::connect`] resolves on the first successful handshake
//! - [`ChatClient::subscribe_to_room`] / [`ChatClient::send_message`]
//!   are synchronous fire-and-forget dispatches
//! - [`ChatClient::disconnect`] is idempotent teardown
//! - [`ChatClient::state`] / [`ChatClient::messages`] expose `watch`
//!   receivers for reactive observation
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, [`ws::WsConnector`] dials the
//! platform's WebSocket chat endpoint. Tests run against a scripted
//! in-memory [`Connector`] instead.

mod client;
mod config;
mod connector;
mod error;

#[cfg(feature = "transport")]
pub mod ws;

pub use client::ChatClient;
pub use config::{CHAT_ENDPOINT_PATH, ClientConfig};
pub use connector::{Connector, Transport, TransportEvent};
pub use error::ClientError;
pub use staychat_core::{
    LogEntry, RoomId, SessionConfig, SessionError, SessionState, UserId,
};
