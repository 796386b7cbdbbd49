//! Client configuration.

use staychat_core::SessionConfig;

/// Sub-path of the chat upgrade endpoint, fixed by the platform.
pub const CHAT_ENDPOINT_PATH: &str = "/ws-chat";

/// Driver configuration: where to dial and how the session behaves.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the platform API, `http(s)://host[:port]`.
    pub endpoint: String,

    /// Session policy (settle delay, reconnect delay, heartbeats).
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Configuration with default session policy for the given base URL.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), session: SessionConfig::default() }
    }

    /// WebSocket URL of the chat upgrade endpoint, scheme derived from
    /// the base URL (`http → ws`, `https → wss`).
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}{CHAT_ENDPOINT_PATH}")
    }
}
