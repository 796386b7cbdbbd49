//! Driver-level error types.

use staychat_core::SessionError;
use thiserror::Error;

/// Errors surfaced by [`crate::ChatClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Refusal or failure reported by the session state machine.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Socket-level failure. Rejects `connect` on the first dial only;
    /// later occurrences feed the reconnect loop instead.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client was shut down while a connect was still pending.
    #[error("client shut down before the connection was established")]
    Shutdown,
}
