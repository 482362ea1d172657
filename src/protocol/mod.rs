//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary packet protocol of the broadcast
//! connection:
//! - 16-byte header encoding/decoding
//! - Frame struct with typed accessors
//! - Lazy decoding of a message buffer, expanding zlib/brotli envelopes

mod compression;
mod decoder;
mod frame;
mod wire_format;

pub use compression::Compression;
pub use decoder::{decode, decode_all, Frames};
pub use frame::{build_frame, Frame, AUTH_PROTOCOL_VERSION};
pub use wire_format::{sequence, Header, Operation, ProtocolVersion, HEADER_LENGTH, HEADER_SIZE};
