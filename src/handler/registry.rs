//! Handler registry for dispatching application messages by command name.
//!
//! Handlers come in two shapes, both stored behind the same [`Handler`]
//! trait so the dispatcher never cares which one it calls:
//! - synchronous: `Fn(Message) -> HandlerResult`
//! - suspending: `Fn(Message) -> impl Future<Output = HandlerResult>`
//!
//! Commands without a handler go to the fallback, which by default logs and
//! discards the message.
//!
//! # Example
//!
//! ```ignore
//! use bililive_client::handler::HandlerRegistry;
//!
//! let registry = HandlerRegistry::new();
//!
//! registry.register("DANMU_MSG", |msg| {
//!     println!("{}", msg.cmd());
//!     Ok(())
//! });
//!
//! registry.register_async("SEND_GIFT", |msg| async move {
//!     store(msg).await
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Message;
use crate::error::Result;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for message handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle a message; completes possibly after suspension.
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult>;
}

/// Handler that completes synchronously.
pub struct SyncHandler<F> {
    handler: F,
}

impl<F> SyncHandler<F>
where
    F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
{
    /// Create a new synchronous handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Handler for SyncHandler<F>
where
    F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult> {
        let result = (self.handler)(message);
        Box::pin(std::future::ready(result))
    }
}

/// Handler that returns a future the dispatcher awaits.
pub struct AsyncHandler<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncHandler<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new suspending handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Handler for AsyncHandler<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(message))
    }
}

/// Default fallback: logs the command and drops the message.
pub struct DiscardHandler;

impl Handler for DiscardHandler {
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult> {
        tracing::debug!(cmd = message.cmd(), "discard message");
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Registry mapping command names to handlers.
///
/// The registry is internally synchronized and meant to be shared as
/// `Arc<HandlerRegistry>` between the caller and a session. Handlers can be
/// registered at any time; a dispatch already in flight keeps the handler it
/// looked up.
pub struct HandlerRegistry {
    /// Handlers by command name.
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
    /// Handler for commands without an entry.
    fallback: RwLock<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry with the discard fallback.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            fallback: RwLock::new(Arc::new(DiscardHandler)),
        }
    }

    /// Register a synchronous handler, replacing any previous one.
    pub fn register<F>(&self, command: impl Into<String>, handler: F)
    where
        F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(command, SyncHandler::new(handler));
    }

    /// Register a suspending handler, replacing any previous one.
    pub fn register_async<F, Fut>(&self, command: impl Into<String>, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(command, AsyncHandler::new(handler));
    }

    /// Register any [`Handler`] implementation, replacing any previous one.
    pub fn register_handler(&self, command: impl Into<String>, handler: impl Handler) {
        let command = command.into();
        let previous = self.handlers.write().insert(command.clone(), Arc::new(handler));
        if previous.is_some() {
            tracing::debug!(cmd = %command, "replaced handler");
        }
    }

    /// Replace the handler used for unregistered commands.
    pub fn set_fallback(&self, handler: impl Handler) {
        *self.fallback.write() = Arc::new(handler);
    }

    /// Check if a command has its own handler.
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.read().contains_key(command)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Check if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Handler that `dispatch` would call for `command`.
    pub fn resolve(&self, command: &str) -> Arc<dyn Handler> {
        if let Some(handler) = self.handlers.read().get(command) {
            return handler.clone();
        }
        self.fallback.read().clone()
    }

    /// Dispatch a message to its handler and wait for it to complete.
    ///
    /// No lock is held while the handler runs.
    pub async fn dispatch(&self, message: Message) -> HandlerResult {
        let handler = self.resolve(message.cmd());
        handler.call(message).await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
