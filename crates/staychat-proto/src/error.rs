//! Protocol-level error types.
//!
//! Frame syntax and body decode failures. A single malformed frame is a
//! recoverable condition: callers drop the frame and keep the subscription
//! alive, so these errors carry enough context to log and move on.

use thiserror::Error;

/// Errors produced while encoding or decoding broker frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text was empty or contained no command line.
    #[error("empty frame")]
    EmptyFrame,

    /// Command line did not match any known command.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A header line had no `:` separator.
    #[error("malformed header line: {line:?}")]
    MalformedHeader {
        /// The offending header line.
        line: String,
    },

    /// A header value used an escape sequence outside the STOMP set.
    #[error("invalid escape sequence {sequence:?} in header")]
    InvalidEscape {
        /// The two-character sequence that failed to decode.
        sequence: String,
    },

    /// A header required by the command was missing.
    #[error("missing required header {name:?}")]
    MissingHeader {
        /// Name of the absent header.
        name: &'static str,
    },

    /// Frame body was not a valid chat payload.
    #[error("malformed body: {0}")]
    MalformedBody(String),
}
