//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and payload.
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use bililive_client::protocol::{Frame, Operation, ProtocolVersion};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(ProtocolVersion::Plain, Operation::Message, Bytes::from_static(b"hello"));
//!
//! assert_eq!(frame.operation(), Operation::Message);
//! assert_eq!(frame.header.total_length, 21);
//! assert_eq!(frame.payload(), b"hello");
//! ```

use bytes::Bytes;
use serde::Serialize;

use super::compression::Compression;
use super::wire_format::{Header, Operation, ProtocolVersion, HEADER_LENGTH, HEADER_SIZE};
use crate::error::Result;

/// Protocol version requested in the auth frame: brotli envelopes.
pub const AUTH_PROTOCOL_VERSION: u16 = 3;

/// JSON body of the authentication frame.
#[derive(Debug, Clone, Serialize)]
struct AuthBody {
    roomid: u64,
    protover: u16,
}

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame; the header lengths are derived from the payload.
    pub fn new(protocol_version: ProtocolVersion, operation: Operation, payload: Bytes) -> Self {
        Self {
            header: Header::for_payload(protocol_version, operation, payload.len()),
            payload,
        }
    }

    /// Create a frame from a decoded header and its payload, as-is.
    pub fn from_parts(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Heartbeat request: plain, empty payload.
    pub fn heartbeat() -> Self {
        Self::new(ProtocolVersion::Plain, Operation::Heartbeat, Bytes::new())
    }

    /// Authentication request for the given (long) room id.
    ///
    /// Payload is `{"roomid": <room_id>, "protover": 3}`.
    pub fn auth(room_id: u64) -> Result<Self> {
        let body = serde_json::to_vec(&AuthBody {
            roomid: room_id,
            protover: AUTH_PROTOCOL_VERSION,
        })?;
        Ok(Self::new(
            ProtocolVersion::Plain,
            Operation::Auth,
            Bytes::from(body),
        ))
    }

    /// Wrap `frames` into one compressed envelope frame.
    ///
    /// This is the shape the server uses to batch application messages; the
    /// decoder expands it back into the same frames in the same order.
    pub fn compressed(algorithm: Compression, frames: &[Frame]) -> Result<Self> {
        let mut inner = Vec::with_capacity(frames.iter().map(Frame::encoded_len).sum());
        for frame in frames {
            frame.encode_into(&mut inner);
        }
        let payload = algorithm.compress(&inner)?;
        Ok(Self::new(
            algorithm.into(),
            Operation::Message,
            Bytes::from(payload),
        ))
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Get the operation.
    #[inline]
    pub fn operation(&self) -> Operation {
        self.header.operation
    }

    /// Get the protocol version.
    #[inline]
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.header.protocol_version
    }

    /// Get the sequence tag.
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    /// Size of this frame on the wire.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode to a contiguous byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Append the encoded frame to `buf`.
    ///
    /// The length fields are always written from the actual payload.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let header = Header {
            total_length: self.encoded_len() as u32,
            header_length: HEADER_LENGTH,
            ..self.header
        };
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&self.payload);
    }
}

/// Build a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use bililive_client::protocol::{build_frame, Operation, ProtocolVersion};
///
/// let bytes = build_frame(ProtocolVersion::Plain, Operation::Message, b"hello");
/// assert_eq!(bytes.len(), 16 + 5);
/// ```
pub fn build_frame(protocol_version: ProtocolVersion, operation: Operation, payload: &[u8]) -> Vec<u8> {
    let header = Header::for_payload(protocol_version, operation, payload.len());
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::protocol::{decode_all, sequence};

    /// Uncompressed frames with any operation, sequence and payload.
    impl Arbitrary for Frame {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (
                prop_oneof![Just(ProtocolVersion::Plain), Just(ProtocolVersion::PlainDefault)],
                any::<u32>(),
                any::<u32>(),
                proptest::collection::vec(any::<u8>(), 0..64),
            )
                .prop_map(|(version, operation, sequence, payload)| {
                    let total = (HEADER_SIZE + payload.len()) as u32;
                    let header = Header::new(total, version, Operation::from(operation), sequence);
                    Frame::from_parts(header, Bytes::from(payload))
                })
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn test_plain_frame_round_trip(frame in any::<Frame>()) {
            let decoded = decode_all(frame.encode()).expect("plain frames decode");
            prop_assert_eq!(decoded, vec![frame]);
        }
    }

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(
            ProtocolVersion::Plain,
            Operation::Message,
            Bytes::from_static(b"hello"),
        );

        assert_eq!(frame.operation(), Operation::Message);
        assert_eq!(frame.protocol_version(), ProtocolVersion::Plain);
        assert_eq!(frame.sequence(), sequence::NORMAL);
        assert_eq!(frame.payload(), b"hello");
        assert_eq!(frame.payload_len(), 5);
        assert_eq!(frame.header.total_length, 21);
    }

    #[test]
    fn test_heartbeat_frame() {
        let frame = Frame::heartbeat();
        assert_eq!(frame.operation(), Operation::Heartbeat);
        assert!(frame.payload().is_empty());
        assert_eq!(
            frame.encode(),
            vec![0, 0, 0, 16, 0, 16, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_auth_frame_payload() {
        let frame = Frame::auth(21452505).unwrap();
        assert_eq!(frame.operation(), Operation::Auth);

        let body: serde_json::Value = serde_json::from_slice(frame.payload()).unwrap();
        assert_eq!(body, serde_json::json!({"roomid": 21452505, "protover": 3}));
    }

    #[test]
    fn test_encode_recomputes_lengths() {
        let header = Header::new(999, ProtocolVersion::Plain, Operation::Message, 1);
        let frame = Frame::from_parts(header, Bytes::from_static(b"abc"));

        let bytes = frame.encode();
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded.total_length, 19);
        assert_eq!(decoded.header_length, 16);
        assert_eq!(decoded.sequence, 1);
    }

    #[test]
    fn test_build_frame_matches_encode() {
        let frame = Frame::new(
            ProtocolVersion::Plain,
            Operation::Message,
            Bytes::from_static(b"{}"),
        );
        assert_eq!(
            build_frame(ProtocolVersion::Plain, Operation::Message, b"{}"),
            frame.encode()
        );
    }

    #[test]
    fn test_compressed_envelope_header() {
        let inner = [Frame::heartbeat(), Frame::heartbeat()];
        let envelope = Frame::compressed(Compression::Zlib, &inner).unwrap();

        assert_eq!(envelope.protocol_version(), ProtocolVersion::Zlib);
        assert_eq!(envelope.operation(), Operation::Message);
        assert_eq!(
            Compression::Zlib.decompress(envelope.payload()).unwrap(),
            [inner[0].encode(), inner[1].encode()].concat()
        );
    }
}
