//! Dedicated writer task for outbound frames.
//!
//! The WebSocket sink is owned by one task that receives frames through an
//! mpsc channel. The read loop (auth frame) and the heartbeat task both hold
//! a cloneable [`WriterHandle`]; neither touches the sink directly.
//!
//! # Architecture
//!
//! ```text
//! Read loop ─┐
//!            ├─► mpsc::Sender<Frame> ─► Writer Task ─► WebSocket sink
//! Heartbeat ─┘
//! ```
//!
//! When the last handle is dropped the writer task sends a close frame and
//! finishes. That is how the session closes the transport.

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use crate::error::{LiveError, Result};
use crate::protocol::Frame;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Maximum frames to feed before a flush.
const MAX_BATCH_SIZE: usize = 16;

/// Handle for sending frames to the writer task.
///
/// This is cheaply cloneable.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Frame>,
}

impl WriterHandle {
    /// Queue a frame, waiting for channel capacity.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| LiveError::ConnectionClosed)
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// # Returns
///
/// A tuple of `(WriterHandle, JoinHandle)`; the JoinHandle resolves once the
/// sink has been closed.
pub fn spawn_writer_task<S>(sink: S, channel_capacity: usize) -> (WriterHandle, JoinHandle<Result<()>>)
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, sink));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives frames and writes them to the sink.
///
/// Frames that are already queued are fed together and flushed once.
async fn writer_loop<S>(mut rx: mpsc::Receiver<Frame>, mut sink: S) -> Result<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    while let Some(first) = rx.recv().await {
        sink.feed(to_ws_message(&first)).await?;

        let mut batch = 1;
        while batch < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => {
                    sink.feed(to_ws_message(&frame)).await?;
                    batch += 1;
                }
                Err(_) => break,
            }
        }

        sink.flush().await?;
    }

    // Channel closed: every handle is gone
    sink.close().await?;
    Ok(())
}

fn to_ws_message(frame: &Frame) -> WsMessage {
    WsMessage::Binary(frame.encode().into())
}
