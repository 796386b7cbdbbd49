//! Destination naming for the chat broker.
//!
//! Two address spaces, symmetric per room: broadcast-bound topics the
//! broker fans out to subscribers, and application-bound destinations
//! the broker routes to the platform's message handler.

use crate::RoomId;

/// Topic a room's participants subscribe to.
#[must_use]
pub fn room_topic(room_id: RoomId) -> String {
    format!("/topic/chatroom/{room_id}")
}

/// Application destination a room's messages are published to.
#[must_use]
pub fn room_send(room_id: RoomId) -> String {
    format!("/app/chat/{room_id}/send")
}
