//! Chat session state machine.
//!
//! Manages the broker connection lifecycle, the single live room
//! subscription, and the per-room message log. Uses the action pattern:
//! each dispatcher method mutates state and returns actions for the
//! driver to execute. This keeps the state machine pure (no I/O) and
//! makes testing straightforward — tests drive it with frames instead of
//! a socket.
//!
//! # State Machine
//!
//! ```text
//!               connect()            CONNECTED frame
//! ┌──────────────┐      ┌────────────┐      ┌───────────┐
//! │ Disconnected │─────>│ Connecting │─────>│ Connected │
//! └──────────────┘      └────────────┘      └───────────┘
//!        ^                    ^                │      │
//!        │  reconnect_elapsed │    ERROR frame │      │ transport close
//!        │                    │                ↓      ↓
//!        │              ┌─────┴────┐      ┌─────────┐
//!        │              │ (retry)  │<─────│ Failing │
//!        │              └──────────┘      └─────────┘
//!        │
//!        └── disconnect() from any state
//! ```
//!
//! `Disconnected` is a resting state, not terminal: a fresh `connect`
//! restarts the machine, and while a credential is held the scheduled
//! reconnect path re-enters `Connecting` on its own.

use std::{fmt, time::Duration};

use staychat_proto::{
    ChatEvent, Command, Frame, OutboundMessage, RoomId, UserId, destination, headers,
};

use crate::{
    error::SessionError,
    log::{LogEntry, MessageLog},
};

/// Grace period between the broker acknowledging the connection and the
/// first subscribe. Subscribing inside the acknowledgment callback races
/// the broker's own session setup on some servers.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Heartbeat interval offered to the broker in each direction.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Session configuration.
///
/// Every delay is overridable so tests can run with zero timers.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait after a successful handshake before the first subscribe.
    pub settle_delay: Duration,
    /// Fixed wait before redialing after a drop or broker error.
    pub reconnect_delay: Duration,
    /// Heartbeat offer on CONNECT, applied in both directions.
    pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Connection state. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport. Resting state; also the post-disconnect state.
    Disconnected,
    /// Transport dialing or handshake in flight.
    Connecting,
    /// Handshake acknowledged; subscribe and send are permitted.
    Connected,
    /// Broker rejected the session; a retry is pending.
    Failing,
}

/// Generation-unique identifier for one broker subscription.
///
/// Frames echo the identifier they were delivered on; frames tagged with
/// a superseded generation are discarded, which closes the race where
/// the broker flushes buffered frames after an unsubscribe was requested
/// but before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Live subscription handle: generation id plus the room it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// Generation-unique subscription identifier.
    pub id: SubscriptionId,
    /// Room whose topic this subscription covers.
    pub room_id: RoomId,
}

/// Actions returned by the session state machine.
///
/// The driver executes these against the real transport; tests assert on
/// them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Dial the configured endpoint and report back via
    /// [`ChatSession::transport_opened`] / [`ChatSession::transport_closed`].
    OpenTransport,

    /// Send this frame to the broker.
    SendFrame(Frame),

    /// Wait `delay`, then call [`ChatSession::settle_elapsed`].
    AwaitSettle {
        /// Configured settle delay.
        delay: Duration,
    },

    /// Wait `delay`, then call [`ChatSession::reconnect_elapsed`].
    ScheduleReconnect {
        /// Configured reconnect delay.
        delay: Duration,
    },

    /// Close the transport and cancel any pending reconnect.
    CloseTransport,

    /// Diagnostic message for the driver's logger.
    Log {
        /// Log line.
        message: String,
    },
}

/// The chat session: one broker connection, at most one live room
/// subscription, and the message log for that room.
///
/// Owned by whoever mounts the chat feature and passed by handle; its
/// lifecycle is explicit (`connect` … `disconnect`), with no ambient
/// global state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    state: SessionState,
    config: SessionConfig,
    local_user_id: UserId,
    credential: Option<String>,
    active_room: Option<RoomId>,
    subscription: Option<Subscription>,
    next_subscription: u64,
    log: MessageLog,
    reconnect_attempts: u32,
    reconnect_pending: bool,
}

impl ChatSession {
    /// Create a disconnected session for the given local user.
    ///
    /// `local_user_id` comes from the caller's auth layer; it decides
    /// read-state defaults and receipt attribution.
    #[must_use]
    pub fn new(local_user_id: UserId, config: SessionConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            config,
            local_user_id,
            credential: None,
            active_room: None,
            subscription: None,
            next_subscription: 0,
            log: MessageLog::new(),
            reconnect_attempts: 0,
            reconnect_pending: false,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True when subscribe and send are permitted.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Room currently targeted. `None` before the first subscribe.
    #[must_use]
    pub fn active_room(&self) -> Option<RoomId> {
        self.active_room
    }

    /// Live subscription handle. Exists iff a room is targeted and the
    /// session is `Connected` past its settle window.
    #[must_use]
    pub fn subscription(&self) -> Option<Subscription> {
        self.subscription
    }

    /// Message log entries for the active room, in delivery order.
    #[must_use]
    pub fn messages(&self) -> &[LogEntry] {
        self.log.entries()
    }

    /// Reconnect attempts since the last successful handshake.
    ///
    /// The session only counts; any give-up ceiling is the caller's
    /// policy.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Begin connecting with the given bearer credential.
    ///
    /// Idempotent while `Connected` or `Connecting`: no second transport
    /// is opened. The credential is retained for re-authentication on
    /// reconnect.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthRequired`] for an empty credential; no
    /// transport is opened in that case.
    pub fn connect(&mut self, credential: &str) -> Result<Vec<SessionAction>, SessionError> {
        if credential.is_empty() {
            return Err(SessionError::AuthRequired);
        }

        match self.state {
            SessionState::Connected | SessionState::Connecting => Ok(vec![]),
            SessionState::Disconnected | SessionState::Failing => {
                self.credential = Some(credential.to_string());
                self.state = SessionState::Connecting;
                Ok(vec![SessionAction::OpenTransport])
            },
        }
    }

    /// The transport socket is up; perform the broker handshake.
    ///
    /// No-op outside `Connecting` so a late dial callback after
    /// `disconnect` does nothing.
    pub fn transport_opened(&mut self) -> Vec<SessionAction> {
        if self.state != SessionState::Connecting {
            return vec![];
        }
        let Some(credential) = &self.credential else {
            return vec![];
        };

        let heartbeat_ms = self.config.heartbeat_interval.as_millis();
        let connect = Frame::new(Command::Connect)
            .with_header(headers::ACCEPT_VERSION, "1.2")
            .with_header(headers::AUTHORIZATION, format!("Bearer {credential}"))
            .with_header(headers::HEART_BEAT, format!("{heartbeat_ms},{heartbeat_ms}"));

        vec![SessionAction::SendFrame(connect)]
    }

    /// Dispatch a frame received from the broker.
    ///
    /// After `disconnect` the session is `Disconnected` and every frame
    /// is ignored.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MalformedFrame`] for a topic frame whose body
    ///   decodes as neither known shape. The frame is dropped; the
    ///   subscription and the session survive.
    /// - [`SessionError::Protocol`] for a command the broker should not
    ///   send.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<SessionAction>, SessionError> {
        if self.state == SessionState::Disconnected {
            return Ok(vec![]);
        }

        match frame.command() {
            Command::Connected => Ok(self.handle_connected()),
            Command::Error => Ok(self.handle_broker_error(frame)),
            Command::Message => self.handle_message(frame),
            other => Err(SessionError::Protocol(format!(
                "unexpected {other} frame from broker"
            ))),
        }
    }

    fn handle_connected(&mut self) -> Vec<SessionAction> {
        self.state = SessionState::Connected;
        self.reconnect_attempts = 0;

        // The room may already be targeted: chosen before the handshake
        // finished, or carried over a reconnect. Resubscribe after the
        // settle window either way.
        if self.active_room.is_some() {
            vec![SessionAction::AwaitSettle { delay: self.config.settle_delay }]
        } else {
            vec![]
        }
    }

    fn handle_broker_error(&mut self, frame: &Frame) -> Vec<SessionAction> {
        self.state = SessionState::Failing;
        self.subscription = None;

        let detail = frame.header(headers::MESSAGE).unwrap_or("no detail");
        let mut actions =
            vec![SessionAction::Log { message: format!("broker error: {detail}") }];
        actions.extend(self.schedule_reconnect());
        actions
    }

    fn handle_message(&mut self, frame: &Frame) -> Result<Vec<SessionAction>, SessionError> {
        let Some(subscription) = self.subscription else {
            return Ok(vec![SessionAction::Log {
                message: "dropping frame: no live subscription".to_string(),
            }]);
        };

        let current = subscription.id.to_string();
        if frame.header(headers::SUBSCRIPTION) != Some(current.as_str()) {
            // Buffered delivery from a superseded subscription; must not
            // land in the new room's log.
            return Ok(vec![SessionAction::Log {
                message: format!("dropping frame from stale subscription (current {current})"),
            }]);
        }

        match ChatEvent::decode(frame.body()) {
            Ok(ChatEvent::Message(message)) => {
                self.log.append(message, self.local_user_id);
                Ok(vec![])
            },
            Ok(ChatEvent::Read(receipt)) => {
                let flipped = self.log.apply_receipt(receipt.reader_id, self.local_user_id);
                if flipped > 0 {
                    Ok(vec![SessionAction::Log {
                        message: format!("read receipt: {flipped} messages marked read"),
                    }])
                } else {
                    Ok(vec![])
                }
            },
            Err(err) => Err(SessionError::MalformedFrame { reason: err.to_string() }),
        }
    }

    /// The settle window after a handshake has elapsed; subscribe to the
    /// targeted room.
    ///
    /// No-op unless still `Connected` with a targeted room and no live
    /// subscription — a manual subscribe during the window, a room
    /// switch, or a disconnect all make the elapsed timer stale.
    pub fn settle_elapsed(&mut self) -> Vec<SessionAction> {
        if self.state != SessionState::Connected || self.subscription.is_some() {
            return vec![];
        }
        match self.active_room {
            Some(room_id) => {
                // Same contract as a caller-driven subscribe: the log
                // restarts with the fresh subscription.
                self.log.clear();
                self.open_subscription(room_id)
            },
            None => vec![],
        }
    }

    /// Target `room_id`: clear the log, release any prior subscription,
    /// subscribe to the room's topic.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] outside the `Connected` state; the
    /// call then has no side effects at all.
    pub fn subscribe_to_room(
        &mut self,
        room_id: RoomId,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected {
                state: self.state,
                operation: "subscribe",
            });
        }

        self.active_room = Some(room_id);
        self.log.clear();

        let mut actions = Vec::with_capacity(2);
        if let Some(old) = self.subscription.take() {
            actions.push(SessionAction::SendFrame(
                Frame::new(Command::Unsubscribe).with_header(headers::ID, old.id.to_string()),
            ));
        }
        actions.extend(self.open_subscription(room_id));
        Ok(actions)
    }

    /// Publish one message to `room_id`.
    ///
    /// Fire-and-forget: no acknowledgment is awaited and nothing is
    /// appended locally — the author's own message reaches the log only
    /// via the broker echo, which is the single source of truth for
    /// ordering.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] outside the `Connected` state; no
    /// frame is published.
    pub fn send_message(
        &mut self,
        room_id: RoomId,
        content: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected { state: self.state, operation: "send" });
        }

        let body = OutboundMessage { content: content.to_string() }.encode()?;
        let frame = Frame::new(Command::Send)
            .with_header(headers::DESTINATION, destination::room_send(room_id))
            .with_body(body);

        Ok(vec![SessionAction::SendFrame(frame)])
    }

    /// The transport closed (network drop or broker-initiated).
    ///
    /// The subscription handle died with the socket. The room target and
    /// the log are kept for display; the resubscribe after a successful
    /// reconnect clears the log. No-op after `disconnect`.
    pub fn transport_closed(&mut self) -> Vec<SessionAction> {
        if self.state == SessionState::Disconnected && self.credential.is_none() {
            return vec![];
        }

        self.state = SessionState::Disconnected;
        self.subscription = None;
        self.schedule_reconnect().into_iter().collect()
    }

    /// The reconnect delay has elapsed; redial.
    ///
    /// No-op if `disconnect` ran in the meantime (no credential) or a
    /// connection is already up.
    pub fn reconnect_elapsed(&mut self) -> Vec<SessionAction> {
        self.reconnect_pending = false;

        if self.credential.is_none()
            || matches!(self.state, SessionState::Connected | SessionState::Connecting)
        {
            return vec![];
        }

        self.state = SessionState::Connecting;
        vec![SessionAction::OpenTransport]
    }

    /// Tear down the session. Idempotent and safe from any state.
    ///
    /// Resets every field to its initial value; late transport or frame
    /// callbacks afterwards are no-ops.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::with_capacity(2);

        if self.state == SessionState::Connected {
            actions.push(SessionAction::SendFrame(Frame::new(Command::Disconnect)));
        }
        if self.state != SessionState::Disconnected || self.credential.is_some() {
            actions.push(SessionAction::CloseTransport);
        }

        self.state = SessionState::Disconnected;
        self.credential = None;
        self.active_room = None;
        self.subscription = None;
        self.log.clear();
        self.reconnect_attempts = 0;
        self.reconnect_pending = false;
        // next_subscription stays monotonic so a frame from before the
        // teardown can never match a post-reconnect subscription id.

        actions
    }

    fn open_subscription(&mut self, room_id: RoomId) -> Vec<SessionAction> {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscription = Some(Subscription { id, room_id });

        vec![SessionAction::SendFrame(
            Frame::new(Command::Subscribe)
                .with_header(headers::ID, id.to_string())
                .with_header(headers::DESTINATION, destination::room_topic(room_id)),
        )]
    }

    fn schedule_reconnect(&mut self) -> Option<SessionAction> {
        if self.credential.is_none() || self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = true;
        self.reconnect_attempts += 1;
        Some(SessionAction::ScheduleReconnect { delay: self.config.reconnect_delay })
    }
}
