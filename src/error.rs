//! Error types for bililive-client.

use thiserror::Error;

use crate::protocol::Compression;

/// Main error type for all live-room operations.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The room-info lookup returned a non-success status code.
    #[error("Room {0} not found")]
    RoomNotFound(u64),

    /// The broadcast connection reached end-of-stream.
    ///
    /// This is the expected way a long-lived connection ends; callers decide
    /// whether to reconnect.
    #[error("Room {0} disconnected")]
    RoomDisconnected(u64),

    /// A compressed frame carried a payload that could not be decompressed.
    #[error("{algorithm} decompression failed: {source}")]
    Decompress {
        /// Algorithm named by the frame's protocol version.
        algorithm: Compression,
        /// Underlying decoder error.
        #[source]
        source: std::io::Error,
    },

    /// Protocol error (malformed application payload, bad heartbeat reply, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The outbound half of the connection is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A message handler reported a failure.
    #[error("Handler error: {0}")]
    Handler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error while talking to the room-info API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl LiveError {
    /// Build a handler error from any displayable value.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Self::Handler(message.to_string())
    }
}

/// Result type alias using LiveError.
pub type Result<T> = std::result::Result<T, LiveError>;
