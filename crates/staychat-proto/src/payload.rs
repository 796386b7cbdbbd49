//! JSON bodies carried on chat topics.
//!
//! A topic frame body is one of two shapes, discriminated by a `type`
//! field: a read-receipt control record (`type: "MESSAGES_READ"`), or an
//! ordinary chat message echoed by the broker. Outbound publishes carry
//! only the content; the broker attaches sender identity from the
//! authenticated connection.
//!
//! Field names on the wire are camelCase, matching the platform's REST
//! payloads.

use serde::{Deserialize, Serialize};

use crate::{UserId, error::ProtocolError};

/// A chat message as echoed by the broker to topic subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Author of the message.
    pub sender_user_id: UserId,

    /// Display name attached by the broker. Absent on older payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// Text body.
    pub content: String,
}

/// Discriminator value marking a read-receipt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ReceiptTag {
    #[serde(rename = "MESSAGES_READ")]
    MessagesRead,
}

/// Control record: `reader_id` has read the room's messages.
///
/// Never appended to the log; it only flips read state on the local
/// user's own messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    #[serde(rename = "type")]
    tag: ReceiptTag,

    /// User who read the room.
    pub reader_id: UserId,
}

impl ReadReceipt {
    /// Create a receipt for the given reader.
    #[must_use]
    pub fn new(reader_id: UserId) -> Self {
        Self { tag: ReceiptTag::MessagesRead, reader_id }
    }
}

/// Decoded body of an inbound topic frame.
///
/// Untagged: a record with `type: "MESSAGES_READ"` decodes as a receipt;
/// anything carrying `senderUserId` and `content` decodes as a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatEvent {
    /// Read-receipt control record.
    Read(ReadReceipt),
    /// Ordinary chat message.
    Message(ChatMessage),
}

impl ChatEvent {
    /// Decode a topic frame body.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedBody`] when the body matches neither
    /// shape.
    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(body).map_err(|e| ProtocolError::MalformedBody(e.to_string()))
    }
}

/// Body of an outbound publish. Content only; the broker knows the
/// sender from the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Text body to publish.
    pub content: String,
}

impl OutboundMessage {
    /// Serialize to a frame body.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedBody`] if serialization fails, which
    /// does not happen for valid UTF-8 content.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::MalformedBody(e.to_string()))
    }
}
