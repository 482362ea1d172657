//! # bililive-client
//!
//! Async client for the Bilibili live-room broadcast protocol.
//!
//! A [`LiveRoom`] connects to a room's broadcast server, keeps the
//! connection alive with heartbeats and routes every application message
//! (danmaku, gifts, ...) to the handler registered for its `cmd`.
//!
//! ## Architecture
//!
//! - **Room info** (HTTPS): one lookup resolving the room id before connecting
//! - **Broadcast** (WebSocket): binary packets with a 16-byte header, possibly
//!   carrying zlib or brotli compressed batches of further packets
//!
//! ## Example
//!
//! ```ignore
//! use bililive_client::{commands, LiveRoom};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut room = LiveRoom::builder(21452505)
//!         .on(commands::DANMU_MSG, |msg| {
//!             let json = msg.json()?;
//!             println!("{}: {}", json["info"][2][1], json["info"][1]);
//!             Ok(())
//!         })
//!         .build();
//!
//!     let err = room.run().await.unwrap_err();
//!     eprintln!("{}", err);
//! }
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod room;
pub mod transport;

mod heartbeat;
mod session;
mod writer;

pub use error::{LiveError, Result};
pub use handler::{HandlerRegistry, Message};
pub use heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
pub use room::{LiveStatus, RoomInfo};
pub use session::{LiveRoom, LiveRoomBuilder, SessionConfig, SessionState};
pub use writer::DEFAULT_CHANNEL_CAPACITY;
