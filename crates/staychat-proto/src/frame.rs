//! Text frame codec.
//!
//! One frame on the wire:
//!
//! ```text
//! COMMAND
//! header:value
//! header:value
//!
//! body^@
//! ```
//!
//! (`^@` is the NUL terminator.) Header names and values use the STOMP
//! escape set: `\\`, `\n`, `\r` and `\c` for backslash, line feed,
//! carriage return and colon. Escaping applies to every command; the
//! broker carries no 1.0-compat frames. Bare end-of-line frames are
//! heartbeats and never reach [`Frame::decode`]; transports skip them
//! with [`Frame::is_heartbeat`].
//!
//! # Invariants
//!
//! - Round trip: `Frame::decode(&frame.encode())` reproduces the frame.
//! - Repeated header names keep their order; lookups return the first
//!   occurrence.

use std::fmt;

use crate::error::ProtocolError;

/// Well-known header names used by the broker contract.
pub mod headers {
    /// Subscription/publish target address.
    pub const DESTINATION: &str = "destination";
    /// Client-chosen subscription identifier on SUBSCRIBE/UNSUBSCRIBE.
    pub const ID: &str = "id";
    /// Subscription identifier echoed on MESSAGE frames.
    pub const SUBSCRIPTION: &str = "subscription";
    /// Bearer credential presented on CONNECT.
    pub const AUTHORIZATION: &str = "Authorization";
    /// Protocol versions the client accepts.
    pub const ACCEPT_VERSION: &str = "accept-version";
    /// Heartbeat offer/acceptance, `cx,cy` in milliseconds.
    pub const HEART_BEAT: &str = "heart-beat";
    /// Protocol version confirmed by the broker on CONNECTED.
    pub const VERSION: &str = "version";
    /// Short error description on ERROR frames.
    pub const MESSAGE: &str = "message";
}

/// Command subset understood by the chat broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake carrying the credential.
    Connect,
    /// Broker acknowledgment of a successful handshake.
    Connected,
    /// Open a subscription to a topic.
    Subscribe,
    /// Release a subscription.
    Unsubscribe,
    /// Publish a payload to an application destination.
    Send,
    /// Broker delivery of a topic payload to a subscriber.
    Message,
    /// Broker-reported protocol failure.
    Error,
    /// Client-initiated teardown.
    Disconnect,
}

impl Command {
    /// Wire spelling of the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    fn parse(line: &str) -> Result<Self, ProtocolError> {
        match line {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "SEND" => Ok(Self::Send),
            "MESSAGE" => Ok(Self::Message),
            "ERROR" => Ok(Self::Error),
            "DISCONNECT" => Ok(Self::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete broker frame: command, headers and body.
///
/// Headers are kept in insertion order. Values are stored unescaped;
/// escaping happens only at the wire boundary in [`Frame::encode`] and
/// [`Frame::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header. Builder-style; duplicate names are kept.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body. Builder-style.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The frame command.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// First value for `name`, per the first-occurrence-wins rule.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// All headers in insertion order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The frame body, unterminated.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// True if `text` is a bare end-of-line heartbeat rather than a frame.
    #[must_use]
    pub fn is_heartbeat(text: &str) -> bool {
        matches!(text, "" | "\n" | "\r\n")
    }

    /// Serialize to wire text, including the NUL terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            escape_into(&mut out, name);
            out.push(':');
            escape_into(&mut out, value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse wire text into a frame.
    ///
    /// Tolerates `\r\n` line endings and a missing NUL terminator. The
    /// body is everything after the first blank line, minus the
    /// terminator.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyFrame`] for heartbeat or empty input
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized command line
    /// - [`ProtocolError::MalformedHeader`] for a header line without `:`
    /// - [`ProtocolError::InvalidEscape`] for an escape outside the set
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let text = text.strip_suffix('\0').unwrap_or(text);
        let (head, body) = split_head_body(text);

        let mut lines = head.lines();

        let command_line = lines.next().filter(|l| !l.is_empty()).ok_or(ProtocolError::EmptyFrame)?;
        let command = Command::parse(command_line)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader { line: line.to_string() })?;
            headers.push((unescape(name)?, unescape(value)?));
        }

        Ok(Self { command, headers, body: body.to_string() })
    }
}

/// Split at the first blank line, whichever end-of-line convention wrote it.
fn split_head_body(text: &str) -> (&str, &str) {
    let lf = text.find("\n\n");
    let crlf = text.find("\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) if b < a => (&text[..b], &text[b + 3..]),
        (None, Some(b)) => (&text[..b], &text[b + 3..]),
        (Some(a), _) => (&text[..a], &text[a + 2..]),
        (None, None) => (text, ""),
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, ProtocolError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                let mut sequence = String::from('\\');
                if let Some(next) = other {
                    sequence.push(next);
                }
                return Err(ProtocolError::InvalidEscape { sequence });
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_command_headers_blank_line_body() {
        let frame = Frame::new(Command::Send)
            .with_header(headers::DESTINATION, "/app/chat/7/send")
            .with_body("{\"content\":\"hi\"}");

        let wire = frame.encode();
        assert_eq!(wire, "SEND\ndestination:/app/chat/7/send\n\n{\"content\":\"hi\"}\0");
    }

    #[test]
    fn decode_roundtrips_encode() {
        let frame = Frame::new(Command::Subscribe)
            .with_header(headers::ID, "sub-3")
            .with_header(headers::DESTINATION, "/topic/chatroom/42");

        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn header_values_with_reserved_characters_survive() {
        let frame = Frame::new(Command::Connect)
            .with_header(headers::AUTHORIZATION, "Bearer ab:cd\\ef");

        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.header(headers::AUTHORIZATION), Some("Bearer ab:cd\\ef"));
    }

    #[test]
    fn first_header_occurrence_wins() {
        let frame = Frame::decode("MESSAGE\nsubscription:sub-1\nsubscription:sub-2\n\n\0").unwrap();
        assert_eq!(frame.header(headers::SUBSCRIPTION), Some("sub-1"));
    }

    #[test]
    fn decode_tolerates_crlf_and_missing_nul() {
        let frame = Frame::decode("CONNECTED\r\nversion:1.2\r\n\nbody").unwrap();
        assert_eq!(frame.command(), Command::Connected);
        assert_eq!(frame.header(headers::VERSION), Some("1.2"));
    }

    #[test]
    fn decode_handles_full_crlf_framing() {
        let frame = Frame::decode("MESSAGE\r\nsubscription:sub-1\r\n\r\n{\"content\":\"hi\"}\0").unwrap();
        assert_eq!(frame.header(headers::SUBSCRIPTION), Some("sub-1"));
        assert_eq!(frame.body(), "{\"content\":\"hi\"}");
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = Frame::decode("SNED\n\n\0").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(_)));
    }

    #[test]
    fn header_line_without_colon_is_rejected() {
        let err = Frame::decode("SEND\nbroken line\n\n\0").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedHeader { .. }));
    }

    #[test]
    fn invalid_escape_is_rejected() {
        let err = Frame::decode("SEND\nkey:bad\\qescape\n\n\0").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEscape { .. }));
    }

    #[test]
    fn heartbeats_are_not_frames() {
        assert!(Frame::is_heartbeat("\n"));
        assert!(Frame::is_heartbeat("\r\n"));
        assert!(!Frame::is_heartbeat("SEND\n\n\0"));
        assert!(matches!(Frame::decode("\n"), Err(ProtocolError::EmptyFrame)));
    }
}
