//! Chat client driver.
//!
//! Owns a [`ChatSession`] behind a mutex and executes its actions
//! against the transport: dials through the [`Connector`], pumps
//! transport events into the state machine, runs the settle and
//! reconnect timers, and publishes state and log snapshots on `watch`
//! channels for the UI to observe.
//!
//! All session mutations are serialized through the mutex, so transport
//! callbacks are never concurrent with caller dispatches. Transports are
//! generation-counted: events from a transport that has been replaced or
//! closed are discarded before they reach the session.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use staychat_core::{
    ChatSession, LogEntry, RoomId, SessionAction, SessionConfig, SessionState, UserId,
};
use staychat_proto::Frame;
use tokio::sync::{mpsc, watch};

use crate::{
    connector::{Connector, Transport, TransportEvent},
    error::ClientError,
};

/// Handle to one chat session and its driver tasks.
///
/// Cheap to clone; all clones share the same session. Constructed where
/// the chat feature mounts and torn down with [`ChatClient::disconnect`]
/// where it unmounts.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<Inner>,
}

struct Inner {
    session: Mutex<ChatSession>,
    connector: Arc<dyn Connector>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    /// Bumped on every attach and close; tasks holding an older value
    /// are talking about a transport that no longer exists.
    transport_generation: AtomicU64,
    state_tx: watch::Sender<SessionState>,
    log_tx: watch::Sender<Vec<LogEntry>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ChatClient {
    /// Create a client for `local_user_id` dialing through `connector`.
    #[must_use]
    pub fn new(connector: impl Connector, local_user_id: UserId, session: SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (log_tx, _) = watch::channel(Vec::new());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(ChatSession::new(local_user_id, session)),
                connector: Arc::new(connector),
                outbound: Mutex::new(None),
                transport_generation: AtomicU64::new(0),
                state_tx,
                log_tx,
                shutdown_tx,
            }),
        }
    }

    /// Create a client over the platform's WebSocket chat endpoint.
    #[cfg(feature = "transport")]
    #[must_use]
    pub fn over_websocket(config: &crate::config::ClientConfig, local_user_id: UserId) -> Self {
        Self::new(crate::ws::WsConnector::new(config), local_user_id, config.session.clone())
    }

    /// Connect with the given bearer credential.
    ///
    /// Resolves on the first successful broker handshake. Idempotent
    /// while already connected. A broker-level rejection after the
    /// socket came up does not fail this call; the reconnect loop keeps
    /// retrying and the call resolves on the eventual success.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Session`] with `AuthRequired` for an empty
    ///   credential; nothing is dialed.
    /// - [`ClientError::Transport`] when the first dial fails at the
    ///   socket level. Retries continue in the background regardless, so
    ///   the caller can surface "could not connect" while the session
    ///   self-heals.
    /// - [`ClientError::Shutdown`] when `disconnect` runs first.
    pub async fn connect(&self, credential: &str) -> Result<(), ClientError> {
        let _ = self.inner.shutdown_tx.send(false);

        let actions = dispatch(&self.inner, |s| s.connect(credential))?;
        if *self.inner.state_tx.borrow() == SessionState::Connected {
            return Ok(());
        }

        let mut wants_dial = false;
        let rest: Vec<SessionAction> = actions
            .into_iter()
            .filter(|action| {
                if matches!(action, SessionAction::OpenTransport) {
                    wants_dial = true;
                    false
                } else {
                    true
                }
            })
            .collect();
        execute_actions(&self.inner, rest);

        if wants_dial {
            // The first dial runs inline so a socket-level failure can
            // reject this call; redials live in background tasks.
            if let Err(err) = dial_and_attach(&self.inner).await {
                let closed = dispatch(&self.inner, ChatSession::transport_closed);
                execute_actions(&self.inner, closed);
                return Err(err);
            }
        }

        self.await_handshake().await
    }

    async fn await_handshake(&self) -> Result<(), ClientError> {
        let mut state_rx = self.inner.state_tx.subscribe();
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        loop {
            if *state_rx.borrow_and_update() == SessionState::Connected {
                return Ok(());
            }
            if *shutdown_rx.borrow_and_update() {
                return Err(ClientError::Shutdown);
            }

            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return Err(ClientError::Shutdown);
                    }
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        return Err(ClientError::Shutdown);
                    }
                },
            }
        }
    }

    /// Target a room: clear the log, release the previous subscription,
    /// subscribe to the room's topic. Synchronous dispatch; the frames
    /// go out fire-and-forget.
    ///
    /// # Errors
    ///
    /// [`ClientError::Session`] with `NotConnected` outside the
    /// connected state; no side effects in that case.
    pub fn subscribe_to_room(&self, room_id: RoomId) -> Result<(), ClientError> {
        let actions = dispatch(&self.inner, |s| s.subscribe_to_room(room_id))?;
        execute_actions(&self.inner, actions);
        Ok(())
    }

    /// Publish one message to the room. Fire-and-forget; the message
    /// shows up in the log only via the broker echo.
    ///
    /// # Errors
    ///
    /// [`ClientError::Session`] with `NotConnected` outside the
    /// connected state; nothing is published.
    pub fn send_message(&self, room_id: RoomId, content: &str) -> Result<(), ClientError> {
        let actions = dispatch(&self.inner, |s| s.send_message(room_id, content))?;
        execute_actions(&self.inner, actions);
        Ok(())
    }

    /// Tear the session down. Idempotent and safe from any state; late
    /// transport callbacks after this are discarded.
    pub fn disconnect(&self) {
        let actions = dispatch(&self.inner, ChatSession::disconnect);
        execute_actions(&self.inner, actions);
        let _ = self.inner.shutdown_tx.send(true);
    }

    /// Observe the connection state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Observe the active room's message log. Snapshots are read-only;
    /// the log itself is owned by the session.
    #[must_use]
    pub fn messages(&self) -> watch::Receiver<Vec<LogEntry>> {
        self.inner.log_tx.subscribe()
    }

    /// Reconnect attempts since the last successful handshake. Callers
    /// enforce their own give-up ceiling with this.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        lock_session(&self.inner).reconnect_attempts()
    }
}

fn lock_session(inner: &Inner) -> MutexGuard<'_, ChatSession> {
    inner.session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run one session dispatch under the lock, then publish observables.
fn dispatch<R>(inner: &Inner, f: impl FnOnce(&mut ChatSession) -> R) -> R {
    let mut session = lock_session(inner);
    let result = f(&mut session);

    let state = session.state();
    inner.state_tx.send_if_modified(|current| {
        if *current == state {
            false
        } else {
            *current = state;
            true
        }
    });
    let log = session.messages();
    inner.log_tx.send_if_modified(|current| {
        if current.as_slice() == log {
            false
        } else {
            *current = log.to_vec();
            true
        }
    });

    result
}

/// Execute session actions against the transport and timers.
fn execute_actions(inner: &Arc<Inner>, actions: Vec<SessionAction>) {
    for action in actions {
        match action {
            SessionAction::OpenTransport => {
                let inner = Arc::clone(inner);
                tokio::spawn(async move {
                    if let Err(err) = dial_and_attach(&inner).await {
                        tracing::warn!(%err, "redial failed");
                        let closed = dispatch(&inner, ChatSession::transport_closed);
                        execute_actions(&inner, closed);
                    }
                });
            },

            SessionAction::SendFrame(frame) => {
                let sent = {
                    let outbound = inner.outbound.lock().unwrap_or_else(PoisonError::into_inner);
                    match outbound.as_ref() {
                        Some(tx) => tx.send(frame).is_ok(),
                        None => false,
                    }
                };
                if !sent {
                    tracing::warn!("transport gone; outbound frame dropped");
                }
            },

            SessionAction::AwaitSettle { delay } => {
                let inner = Arc::clone(inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let actions = dispatch(&inner, ChatSession::settle_elapsed);
                    execute_actions(&inner, actions);
                });
            },

            SessionAction::ScheduleReconnect { delay } => {
                let inner = Arc::clone(inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let actions = dispatch(&inner, ChatSession::reconnect_elapsed);
                    execute_actions(&inner, actions);
                });
            },

            SessionAction::CloseTransport => {
                inner.transport_generation.fetch_add(1, Ordering::SeqCst);
                let mut outbound = inner.outbound.lock().unwrap_or_else(PoisonError::into_inner);
                // Dropping the sender closes the socket.
                *outbound = None;
            },

            SessionAction::Log { message } => tracing::debug!("{message}"),
        }
    }
}

/// Dial once and wire the resulting transport into the session.
async fn dial_and_attach(inner: &Arc<Inner>) -> Result<(), ClientError> {
    let Transport { outbound, events } = inner.connector.dial().await?;

    let generation = inner.transport_generation.fetch_add(1, Ordering::SeqCst) + 1;
    {
        let mut current = inner.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(outbound);
    }

    // A disconnect may have raced the dial; close the fresh socket
    // instead of attaching it to a torn-down session.
    if lock_session(inner).state() == SessionState::Disconnected {
        execute_actions(inner, vec![SessionAction::CloseTransport]);
        return Ok(());
    }

    let actions = dispatch(inner, ChatSession::transport_opened);
    execute_actions(inner, actions);

    tokio::spawn(run_transport_events(Arc::clone(inner), events, generation));
    Ok(())
}

/// Pump one transport's events into the session until it closes or a
/// newer transport supersedes it.
async fn run_transport_events(
    inner: Arc<Inner>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        if inner.transport_generation.load(Ordering::SeqCst) != generation {
            // A newer transport took over; this tail is stale.
            return;
        }

        match event {
            TransportEvent::Frame(frame) => {
                match dispatch(&inner, |s| s.handle_frame(&frame)) {
                    Ok(actions) => execute_actions(&inner, actions),
                    Err(err) => tracing::warn!(%err, "inbound frame dropped"),
                }
            },
            TransportEvent::Closed { reason } => {
                tracing::info!(%reason, "transport closed");
                let actions = dispatch(&inner, ChatSession::transport_closed);
                execute_actions(&inner, actions);
                return;
            },
        }
    }

    // Event stream ended without a close notification.
    if inner.transport_generation.load(Ordering::SeqCst) == generation {
        let actions = dispatch(&inner, ChatSession::transport_closed);
        execute_actions(&inner, actions);
    }
}
