//! Session core for the staychat realtime chat client.
//!
//! Sans-IO state machine managing one broker connection, at most one
//! live room subscription, and the ordered message log for that room.
//! The session receives events (caller intents, transport lifecycle,
//! broker frames), processes them through pure transition logic, and
//! returns actions ([`SessionAction`]) for the driver to execute.
//!
//! # Components
//!
//! - [`ChatSession`]: the state machine, one dispatcher per event kind
//! - [`SessionConfig`]: settle/reconnect/heartbeat policy, test-tunable
//! - [`MessageLog`] / [`LogEntry`]: per-room log with read-receipt
//!   reconciliation
//! - [`SessionError`]: the error taxonomy surfaced to callers
//!
//! No sockets and no clocks live here; see the `staychat-client` crate
//! for the tokio driver that executes the actions.

mod error;
mod log;
mod session;

pub use error::SessionError;
pub use log::{LogEntry, MessageLog};
pub use session::{
    ChatSession, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY, DEFAULT_SETTLE_DELAY,
    SessionAction, SessionConfig, SessionState, Subscription, SubscriptionId,
};
pub use staychat_proto::{RoomId, UserId};
