//! Per-room message log.
//!
//! Append order equals broker delivery order; the log never reorders or
//! deduplicates. Read state is tracked only for the local user's own
//! outbound messages: their echoes start unread and flip to read when
//! the other party's receipt arrives.

use staychat_proto::{ChatMessage, UserId};

/// One message in the room log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Author of the message.
    pub sender_user_id: UserId,

    /// Display name attached by the broker, when present.
    pub sender_name: Option<String>,

    /// Text body.
    pub content: String,

    /// `Some(false)` for the local user's own messages until a receipt
    /// arrives, `Some(true)` once receipted, `None` for messages from
    /// others (read state is not tracked for inbound messages).
    pub read_by_recipient: Option<bool>,
}

/// The message log for the currently subscribed room.
///
/// Owned exclusively by the session; external readers observe entries
/// through [`MessageLog::entries`] and never mutate them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in broker delivery order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of logged messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no messages are logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fold a broker echo into the log, computing its read state.
    pub(crate) fn append(&mut self, message: ChatMessage, local_user_id: UserId) {
        let read_by_recipient = (message.sender_user_id == local_user_id).then_some(false);
        self.entries.push(LogEntry {
            sender_user_id: message.sender_user_id,
            sender_name: message.sender_name,
            content: message.content,
            read_by_recipient,
        });
    }

    /// Apply a read-receipt: flip the local user's unread messages to
    /// read, unless the receipt is the local user's own echo (which
    /// signals nothing about the other party). Returns how many entries
    /// flipped.
    pub(crate) fn apply_receipt(&mut self, reader_id: UserId, local_user_id: UserId) -> usize {
        if reader_id == local_user_id {
            return 0;
        }

        let mut flipped = 0;
        for entry in &mut self.entries {
            if entry.sender_user_id == local_user_id && entry.read_by_recipient == Some(false) {
                entry.read_by_recipient = Some(true);
                flipped += 1;
            }
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: UserId = 1;
    const OTHER: UserId = 2;

    fn message(sender: UserId, content: &str) -> ChatMessage {
        ChatMessage { sender_user_id: sender, sender_name: None, content: content.to_string() }
    }

    #[test]
    fn own_messages_start_unread_others_untracked() {
        let mut log = MessageLog::new();
        log.append(message(LOCAL, "hi"), LOCAL);
        log.append(message(OTHER, "hello"), LOCAL);

        assert_eq!(log.entries()[0].read_by_recipient, Some(false));
        assert_eq!(log.entries()[1].read_by_recipient, None);
    }

    #[test]
    fn receipt_from_other_party_flips_own_unread_messages() {
        let mut log = MessageLog::new();
        log.append(message(LOCAL, "hi"), LOCAL);
        log.append(message(OTHER, "hello"), LOCAL);
        log.append(message(LOCAL, "checkout is at 11"), LOCAL);

        let flipped = log.apply_receipt(OTHER, LOCAL);

        assert_eq!(flipped, 2);
        assert_eq!(log.entries()[0].read_by_recipient, Some(true));
        assert_eq!(log.entries()[1].read_by_recipient, None);
        assert_eq!(log.entries()[2].read_by_recipient, Some(true));
    }

    #[test]
    fn own_receipt_echo_changes_nothing() {
        let mut log = MessageLog::new();
        log.append(message(LOCAL, "hi"), LOCAL);

        let flipped = log.apply_receipt(LOCAL, LOCAL);

        assert_eq!(flipped, 0);
        assert_eq!(log.entries()[0].read_by_recipient, Some(false));
    }

    #[test]
    fn receipt_does_not_reflip_already_read_messages() {
        let mut log = MessageLog::new();
        log.append(message(LOCAL, "hi"), LOCAL);
        log.apply_receipt(OTHER, LOCAL);

        let flipped = log.apply_receipt(OTHER, LOCAL);
        assert_eq!(flipped, 0);
    }

    #[test]
    fn append_preserves_delivery_order() {
        let mut log = MessageLog::new();
        for i in 0..5 {
            log.append(message(OTHER, &format!("m{i}")), LOCAL);
        }
        let contents: Vec<&str> =
            log.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
    }
}
