//! Transport module - the WebSocket connection to the broadcast server.
//!
//! Provides:
//! - [`connect`] - open the TLS WebSocket to the broadcast endpoint
//! - [`over_stream`] - wrap an already connected byte stream (used by tests
//!   to run a session over an in-memory pipe)
//! - helpers that classify incoming messages and read errors

mod websocket;

pub use websocket::{connect, is_disconnect, message_bytes, over_stream, WsStream, BROADCAST_URL};
