//! Transport seam.
//!
//! The driver dials through a [`Connector`] and talks to whatever comes
//! back through plain channels. Production uses the WebSocket connector
//! (`transport` feature); tests inject a scripted fake and drive
//! lifecycle and frame events by hand — no real socket involved.

use async_trait::async_trait;
use staychat_proto::Frame;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// Events a live transport reports to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A decoded broker frame arrived.
    Frame(Frame),

    /// The socket closed, by the network or the peer.
    Closed {
        /// Close reason for logging.
        reason: String,
    },
}

/// One dialed transport: frames out, events in.
///
/// Dropping `outbound` closes the transport; the transport answers with
/// a final [`TransportEvent::Closed`] or simply ends the event stream.
#[derive(Debug)]
pub struct Transport {
    /// Sink for outbound frames.
    pub outbound: mpsc::UnboundedSender<Frame>,

    /// Source of inbound transport events.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Dials the chat endpoint, once per call.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open one socket to the chat endpoint.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] when the socket cannot be established.
    async fn dial(&self) -> Result<Transport, ClientError>;
}
