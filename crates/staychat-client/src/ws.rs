//! WebSocket transport.
//!
//! Dials the platform's chat upgrade endpoint and bridges the socket to
//! the driver's frame channels. This is a thin layer that only moves and
//! decodes frames — session logic stays in the sans-IO core.
//!
//! Incoming bare end-of-line heartbeats are consumed here and never
//! surface as frames. Undecodable text is logged and dropped without
//! touching the connection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use staychat_proto::Frame;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    config::ClientConfig,
    connector::{Connector, Transport, TransportEvent},
    error::ClientError,
};

/// Connector for the platform's `/ws-chat` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Build a connector from the client configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self { url: config.ws_url() }
    }

    /// The WebSocket URL this connector dials.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn dial(&self) -> Result<Transport, ClientError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // Writer: frames out until the driver drops its sender.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if sink.send(Message::Text(frame.encode().into())).await.is_err() {
                    return;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        // Reader: frames in until the socket ends.
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(Message::Text(text)) => {
                        if Frame::is_heartbeat(&text) {
                            continue;
                        }
                        match Frame::decode(&text) {
                            Ok(frame) => {
                                if event_tx.send(TransportEvent::Frame(frame)).is_err() {
                                    return;
                                }
                            },
                            Err(err) => tracing::warn!(%err, "dropping undecodable frame"),
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    // Binary and ping/pong are not part of the broker contract.
                    Ok(_) => {},
                    Err(err) => {
                        let _ = event_tx.send(TransportEvent::Closed { reason: err.to_string() });
                        return;
                    },
                }
            }
            let _ = event_tx.send(TransportEvent::Closed { reason: "socket closed".to_string() });
        });

        Ok(Transport { outbound: outbound_tx, events: event_rx })
    }
}
