//! Session and transport errors.

use std::time::Duration;

use thiserror::Error;

/// Failures of the underlying connection: establishment, upgrade, or frame I/O.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Outbound connection could not be established.
    #[error("dial {url} failed: {source}")]
    Dial {
        /// Target URL.
        url: String,
        /// Underlying WebSocket error.
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// Inbound upgrade handshake failed.
    #[error("upgrade failed: {0}")]
    Upgrade(#[source] tokio_tungstenite::tungstenite::Error),

    /// Opening handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// Frame-level error from `tokio-tungstenite`.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Frame-level error from an `axum` WebSocket.
    #[error("websocket error: {0}")]
    Axum(#[from] axum::Error),

    /// The peer end of an in-memory connection went away.
    #[error("in-memory peer disconnected")]
    Disconnected,

    /// Local I/O error (e.g., resolving the peer address).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Misuse of the session API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `start` was called on a session that already left the idle state.
    #[error("session already started")]
    AlreadyStarted,

    /// The session was closed before it could be used.
    #[error("session closed")]
    Closed,

    /// The outbound queue was already half-closed by the producer.
    #[error("outbound queue closed")]
    OutboundClosed,

    /// The inbound queue was already taken by another consumer.
    #[error("inbound queue already taken")]
    InboundTaken,

    /// Timing or sizing values are unusable.
    #[error("invalid socket policy: {0}")]
    InvalidPolicy(String),
}
