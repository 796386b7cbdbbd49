//! Error types for the chat session core.
//!
//! Per-call misuse (`AuthRequired`, `NotConnected`) is returned
//! synchronously to the immediate caller. Frame-level failures
//! (`MalformedFrame`) are returned so the driver can log and drop them;
//! they never tear down the subscription. Nothing here is fatal to the
//! session object: the worst case is a session resting in `Failing` or
//! `Disconnected` until a fresh `connect`.

use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by [`crate::ChatSession`] dispatchers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Connect was called without a credential. No socket is opened.
    #[error("authentication required: connect called without a credential")]
    AuthRequired,

    /// Subscribe or send attempted outside the `Connected` state.
    #[error("not connected: cannot {operation} while {state:?}")]
    NotConnected {
        /// State the session was in when refused.
        state: SessionState,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// Socket-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker sent a frame that is invalid for the session's state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An inbound topic frame decoded as neither known shape.
    ///
    /// The frame is dropped; the subscription stays up.
    #[error("malformed frame dropped: {reason}")]
    MalformedFrame {
        /// Decode failure description.
        reason: String,
    },
}

impl From<staychat_proto::ProtocolError> for SessionError {
    fn from(err: staychat_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
