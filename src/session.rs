//! Live-room session: builder and runtime loop.
//!
//! The [`LiveRoomBuilder`] provides a fluent API for configuring handlers
//! and building the session. The [`LiveRoom`] manages the lifecycle:
//! 1. Fetch room metadata (once)
//! 2. Open the WebSocket to the broadcast endpoint
//! 3. Send the auth frame
//! 4. Start the heartbeat when the server accepts
//! 5. Read frames and dispatch application messages to handlers
//!
//! Every run ends with an error. When the server closes the connection that
//! error is [`LiveError::RoomDisconnected`]; the caller decides whether to
//! run again.
//!
//! # Example
//!
//! ```ignore
//! use bililive_client::{commands, LiveError, LiveRoom};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut room = LiveRoom::builder(21452505)
//!         .on(commands::DANMU_MSG, |msg| {
//!             println!("{}", msg.json()?["info"][1]);
//!             Ok(())
//!         })
//!         .build();
//!
//!     match room.run().await {
//!         Err(LiveError::RoomDisconnected(id)) => println!("room {} went away", id),
//!         Err(e) => return Err(e.into()),
//!         Ok(()) => unreachable!(),
//!     }
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time;
use tokio_tungstenite::WebSocketStream;
use tracing::{Instrument, Span};

use crate::error::{LiveError, Result};
use crate::handler::{HandlerRegistry, HandlerResult, Message};
use crate::heartbeat::{Heartbeat, DEFAULT_HEARTBEAT_INTERVAL};
use crate::protocol::{self, Frame, Operation};
use crate::room::{HttpRoomInfoProvider, RoomInfo, RoomInfoProvider};
use crate::transport::{self, BROADCAST_URL};
use crate::writer::{spawn_writer_task, WriterHandle, DEFAULT_CHANNEL_CAPACITY};

/// How long to wait for the close frame to be written.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the broadcast server.
    pub broadcast_url: String,
    /// Heartbeat period once authenticated.
    pub heartbeat_interval: Duration,
    /// Capacity of the outbound frame queue.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broadcast_url: BROADCAST_URL.to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not running.
    Unconnected,
    /// Auth frame sent, waiting for the server to accept.
    Authenticating,
    /// Authenticated; the heartbeat is running.
    Connected,
    /// The last run finished.
    Terminated,
}

/// Builder for configuring and creating a [`LiveRoom`].
pub struct LiveRoomBuilder {
    room_id: u64,
    registry: Arc<HandlerRegistry>,
    config: SessionConfig,
    provider: Option<Arc<dyn RoomInfoProvider>>,
    api_base: Option<String>,
    info: Option<RoomInfo>,
    span: Option<Span>,
}

impl LiveRoomBuilder {
    /// Create a builder for the room with the given (canonical or short) id.
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            registry: Arc::new(HandlerRegistry::new()),
            config: SessionConfig::default(),
            provider: None,
            api_base: None,
            info: None,
            span: None,
        }
    }

    /// Use a registry shared with the caller.
    ///
    /// Replaces the builder's own registry, so call this before [`on`](Self::on).
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Register a synchronous handler for `command`.
    pub fn on<F>(self, command: &str, handler: F) -> Self
    where
        F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(command, handler);
        self
    }

    /// Register a suspending handler for `command`.
    pub fn on_async<F, Fut>(self, command: &str, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_async(command, handler);
        self
    }

    /// Set the broadcast WebSocket endpoint.
    /// Default: `wss://broadcastlv.chat.bilibili.com:443/sub`
    pub fn broadcast_url(mut self, url: impl Into<String>) -> Self {
        self.config.broadcast_url = url.into();
        self
    }

    /// Set the heartbeat period.
    /// Default: 30 seconds
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the outbound queue capacity.
    /// Default: 64
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Replace the whole connection configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Query room metadata from another API base.
    ///
    /// Ignored when a provider is set with [`room_info_provider`](Self::room_info_provider).
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Use a custom room metadata source.
    pub fn room_info_provider(mut self, provider: impl RoomInfoProvider) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Skip the lookup and use known metadata.
    pub fn room_info(mut self, info: RoomInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Emit the session's log events inside `span`.
    /// Default: an `info` span named `live_room` carrying the room id.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Build the session.
    pub fn build(self) -> LiveRoom {
        let room_id = self.room_id;
        let provider = match (self.provider, self.api_base) {
            (Some(provider), _) => provider,
            (None, Some(base)) => Arc::new(HttpRoomInfoProvider::with_api_base(base)),
            (None, None) => Arc::new(HttpRoomInfoProvider::new()),
        };
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("live_room", room_id));

        LiveRoom {
            room_id,
            info: self.info,
            registry: self.registry,
            provider,
            config: self.config,
            state: watch::Sender::new(SessionState::Unconnected),
            popularity: watch::Sender::new(None),
            span,
        }
    }
}

/// Session with one live room's broadcast server.
pub struct LiveRoom {
    /// Identifier the caller asked for.
    room_id: u64,
    info: Option<RoomInfo>,
    registry: Arc<HandlerRegistry>,
    provider: Arc<dyn RoomInfoProvider>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    popularity: watch::Sender<Option<u32>>,
    span: Span,
}

impl LiveRoom {
    /// Create a session with default settings and an empty registry.
    pub fn new(room_id: u64) -> Self {
        LiveRoomBuilder::new(room_id).build()
    }

    /// Create a builder.
    pub fn builder(room_id: u64) -> LiveRoomBuilder {
        LiveRoomBuilder::new(room_id)
    }

    /// Identifier the session was created with.
    #[inline]
    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    /// Room metadata, once fetched.
    pub fn room_info(&self) -> Option<&RoomInfo> {
        self.info.as_ref()
    }

    /// The handler registry. Handlers may be added while the session runs.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Connection settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Latest popularity reported by a heartbeat reply.
    pub fn popularity(&self) -> Option<u32> {
        *self.popularity.borrow()
    }

    /// Watch popularity updates.
    pub fn subscribe_popularity(&self) -> watch::Receiver<Option<u32>> {
        self.popularity.subscribe()
    }

    /// Register a synchronous handler for `command`.
    pub fn on<F>(&self, command: &str, handler: F)
    where
        F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(command, handler);
    }

    /// Register a suspending handler for `command`.
    pub fn on_async<F, Fut>(&self, command: &str, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_async(command, handler);
    }

    /// Look up the room's metadata and keep it for later runs.
    ///
    /// # Errors
    ///
    /// `RoomNotFound` if the API rejects the identifier.
    pub async fn fetch_room_info(&mut self) -> Result<&RoomInfo> {
        let provider = Arc::clone(&self.provider);
        let info = provider
            .room_info(self.room_id)
            .instrument(self.span.clone())
            .await?;
        tracing::debug!(parent: &self.span, canonical_id = info.room_id, title = %info.title, "room info fetched");
        Ok(self.info.insert(info))
    }

    async fn ensure_room_info(&mut self) -> Result<&RoomInfo> {
        if self.info.is_none() {
            self.fetch_room_info().await?;
        }
        self.info
            .as_ref()
            .ok_or_else(|| LiveError::Protocol("room info missing after fetch".to_string()))
    }

    /// Connect to the broadcast server and run until the connection ends.
    ///
    /// Fetches the room metadata first unless already known. Never returns
    /// `Ok`: a closed connection yields `RoomDisconnected` with the
    /// identifier the session was created with.
    pub async fn connect(&mut self) -> Result<()> {
        self.ensure_room_info().await?;
        let ws = transport::connect(&self.config.broadcast_url)
            .instrument(self.span.clone())
            .await?;
        self.run_on(ws).await
    }

    /// Same as [`connect`](Self::connect).
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await
    }

    /// Run the session over an already opened WebSocket.
    ///
    /// The stream is closed before this returns.
    pub async fn run_on<S>(&mut self, stream: WebSocketStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let auth_id = self.ensure_room_info().await?.room_id;
        let span = self.span.clone();

        let (sink, source) = stream.split();
        let (writer, writer_task) = spawn_writer_task(sink, self.config.channel_capacity);
        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval);

        self.state.send_replace(SessionState::Authenticating);
        let result = async {
            tracing::debug!(room_id = auth_id, "send auth");
            writer.send(Frame::auth(auth_id)?).await?;
            self.read_loop(source, &writer, &mut heartbeat).await
        }
        .instrument(span.clone())
        .await;

        // Stop the timer first so the writer handle below is the last one
        heartbeat.stop().await;
        drop(writer);
        match time::timeout(CLOSE_TIMEOUT, writer_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::debug!(parent: &span, error = %e, "close failed"),
            Ok(Err(e)) => tracing::error!(parent: &span, error = %e, "writer task panicked"),
            Err(_) => tracing::warn!(parent: &span, "close timed out"),
        }
        self.state.send_replace(SessionState::Terminated);

        match result {
            Ok(()) => {
                tracing::info!(parent: &span, "disconnected");
                Err(LiveError::RoomDisconnected(self.room_id))
            }
            Err(e) => Err(e),
        }
    }

    async fn read_loop<S>(
        &self,
        mut source: SplitStream<WebSocketStream<S>>,
        writer: &WriterHandle,
        heartbeat: &mut Heartbeat,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while let Some(message) = source.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) if transport::is_disconnect(&e) => {
                    tracing::debug!(error = %e, "transport closed");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if message.is_close() {
                tracing::debug!(frame = ?message, "close received");
                return Ok(());
            }
            let Some(data) = transport::message_bytes(message) else {
                continue;
            };
            for frame in protocol::decode(data) {
                self.handle_frame(frame?, writer, heartbeat).await?;
            }
        }
        Ok(())
    }

    async fn handle_frame(
        &self,
        frame: Frame,
        writer: &WriterHandle,
        heartbeat: &mut Heartbeat,
    ) -> Result<()> {
        match frame.operation() {
            Operation::AuthAccepted => {
                if heartbeat.start(writer.clone()) {
                    tracing::debug!(interval = ?heartbeat.interval(), "authenticated");
                    self.state.send_replace(SessionState::Connected);
                }
            }
            Operation::HeartbeatReply => {
                let popularity = parse_popularity(frame.payload())?;
                tracing::trace!(popularity, "heartbeat reply");
                self.popularity.send_replace(Some(popularity));
            }
            Operation::Message => {
                let message = Message::from_payload(frame.payload)?;
                self.registry.dispatch(message).await?;
            }
            other => {
                tracing::warn!(operation = %other, len = frame.payload_len(), "unrecognized operation");
            }
        }
        Ok(())
    }
}

/// Read the popularity counter of a heartbeat reply.
fn parse_popularity(payload: &[u8]) -> Result<u32> {
    <[u8; 4]>::try_from(payload)
        .map(u32::from_be_bytes)
        .map_err(|_| {
            LiveError::Protocol(format!(
                "heartbeat reply must carry 4 bytes, got {}",
                payload.len()
            ))
        })
}
