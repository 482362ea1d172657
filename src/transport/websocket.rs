//! WebSocket helpers over `tokio-tungstenite`.
//!
//! # Example
//!
//! ```ignore
//! use bililive_client::transport::{connect, BROADCAST_URL};
//!
//! let ws = connect(BROADCAST_URL).await?;
//! ```

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::Result;

/// Broadcast endpoint of the live chat servers.
pub const BROADCAST_URL: &str = "wss://broadcastlv.chat.bilibili.com:443/sub";

/// WebSocket stream returned by [`connect`].
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a client WebSocket to `url`.
pub async fn connect(url: &str) -> Result<WsStream> {
    let (ws, response) = connect_async(url).await?;
    tracing::debug!(url, status = %response.status(), "websocket connected");
    Ok(ws)
}

/// Use an already connected byte stream as a client WebSocket.
///
/// No HTTP upgrade is performed; both ends must already agree they speak
/// WebSocket framing.
pub async fn over_stream<S>(stream: S, role: Role) -> WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    WebSocketStream::from_raw_socket(stream, role, None).await
}

/// Check if a read error means the peer is gone rather than a fault.
pub fn is_disconnect(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

/// Bytes to run through the frame decoder, if the message carries any.
///
/// Text messages are treated as their UTF-8 bytes. Ping, pong and close
/// messages carry no frames.
pub fn message_bytes(message: WsMessage) -> Option<Bytes> {
    match message {
        WsMessage::Binary(data) => Some(data),
        WsMessage::Text(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => None,
    }
}
