//! Handler module - application message dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps command names to handlers, with a discard fallback
//! - [`Message`] - the decoded application message handed to handlers
//!
//! # Example
//!
//! ```ignore
//! use bililive_client::handler::HandlerRegistry;
//! use bililive_client::commands;
//!
//! let registry = HandlerRegistry::new();
//!
//! registry.register(commands::DANMU_MSG, |msg| {
//!     let json = msg.json()?;
//!     println!("{}", json["info"][1]);
//!     Ok(())
//! });
//! ```

mod message;
mod registry;

pub use message::Message;
pub use registry::{
    AsyncHandler, BoxFuture, DiscardHandler, Handler, HandlerRegistry, HandlerResult, SyncHandler,
};
