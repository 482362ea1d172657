//! Wire format encoding and decoding.
//!
//! Implements the 16-byte packet header:
//! ```text
//! ┌──────────────┬────────────┬──────────┬───────────┬──────────┐
//! │ Total length │ Header len │ Version  │ Operation │ Sequence │
//! │ 4 bytes      │ 2 bytes    │ 2 bytes  │ 4 bytes   │ 4 bytes  │
//! │ uint32 BE    │ uint16 BE  │ uint16 BE│ uint32 BE │ uint32 BE│
//! └──────────────┴────────────┴──────────┴───────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. `Total length` counts the header
//! itself, so a frame with an empty payload has `total_length == 16`.

use std::fmt;

use super::compression::Compression;

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Header length as carried in the `header_length` field.
pub const HEADER_LENGTH: u16 = HEADER_SIZE as u16;

/// Sequence constants.
///
/// The sequence field is reserved by the server; clients always send
/// [`NORMAL`](sequence::NORMAL).
pub mod sequence {
    /// Sequence sent on every outbound frame.
    pub const NORMAL: u32 = 0;
    /// Alternate value seen on some server frames.
    pub const DEFAULT: u32 = 1;
}

/// Payload encoding of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Uncompressed payload (0).
    Plain,
    /// Uncompressed payload, alternate tag (1). Heartbeat replies use it.
    PlainDefault,
    /// Payload is a zlib stream wrapping more frames (2).
    Zlib,
    /// Payload is a brotli stream wrapping more frames (3).
    Brotli,
    /// Unknown tag, treated as uncompressed.
    Other(u16),
}

impl ProtocolVersion {
    /// Compression algorithm this version names, if any.
    #[inline]
    pub fn compression(self) -> Option<Compression> {
        match self {
            Self::Zlib => Some(Compression::Zlib),
            Self::Brotli => Some(Compression::Brotli),
            _ => None,
        }
    }

    /// Check if the payload holds nested, compressed frames.
    #[inline]
    pub fn is_compressed(self) -> bool {
        self.compression().is_some()
    }
}

impl From<u16> for ProtocolVersion {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Plain,
            1 => Self::PlainDefault,
            2 => Self::Zlib,
            3 => Self::Brotli,
            other => Self::Other(other),
        }
    }
}

impl From<ProtocolVersion> for u16 {
    fn from(value: ProtocolVersion) -> Self {
        match value {
            ProtocolVersion::Plain => 0,
            ProtocolVersion::PlainDefault => 1,
            ProtocolVersion::Zlib => 2,
            ProtocolVersion::Brotli => 3,
            ProtocolVersion::Other(other) => other,
        }
    }
}

impl From<Compression> for ProtocolVersion {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Zlib => Self::Zlib,
            Compression::Brotli => Self::Brotli,
        }
    }
}

/// Purpose of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// 0.
    Plain,
    /// 1.
    PlainDefault,
    /// Client keep-alive (2). Payload is empty.
    Heartbeat,
    /// Server reply to a heartbeat (3). Payload is a u32 popularity value.
    HeartbeatReply,
    /// Application message (5). Payload is a JSON object with a `cmd` field.
    Message,
    /// Client authentication request (7).
    Auth,
    /// Server accepted the authentication (8).
    AuthAccepted,
    /// Operation code this client does not know.
    Other(u32),
}

impl From<u32> for Operation {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Plain,
            1 => Self::PlainDefault,
            2 => Self::Heartbeat,
            3 => Self::HeartbeatReply,
            5 => Self::Message,
            7 => Self::Auth,
            8 => Self::AuthAccepted,
            other => Self::Other(other),
        }
    }
}

impl From<Operation> for u32 {
    fn from(value: Operation) -> Self {
        match value {
            Operation::Plain => 0,
            Operation::PlainDefault => 1,
            Operation::Heartbeat => 2,
            Operation::HeartbeatReply => 3,
            Operation::Message => 5,
            Operation::Auth => 7,
            Operation::AuthAccepted => 8,
            Operation::Other(other) => other,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::PlainDefault => f.write_str("plain-default"),
            Self::Heartbeat => f.write_str("heartbeat"),
            Self::HeartbeatReply => f.write_str("heartbeat-reply"),
            Self::Message => f.write_str("message"),
            Self::Auth => f.write_str("auth"),
            Self::AuthAccepted => f.write_str("auth-accepted"),
            Self::Other(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame length in bytes, header included.
    pub total_length: u32,
    /// Header length in bytes (16 for every frame this client sends).
    pub header_length: u16,
    /// Payload encoding.
    pub protocol_version: ProtocolVersion,
    /// Frame purpose.
    pub operation: Operation,
    /// Reserved sequence tag.
    pub sequence: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(
        total_length: u32,
        protocol_version: ProtocolVersion,
        operation: Operation,
        sequence: u32,
    ) -> Self {
        Self {
            total_length,
            header_length: HEADER_LENGTH,
            protocol_version,
            operation,
            sequence,
        }
    }

    /// Create the header for a payload of `payload_len` bytes.
    ///
    /// `total_length` is derived from the payload, which is how the
    /// `total_length == header_length + payload_len` invariant is kept on
    /// encode.
    pub fn for_payload(
        protocol_version: ProtocolVersion,
        operation: Operation,
        payload_len: usize,
    ) -> Self {
        Self::new(
            (HEADER_SIZE + payload_len) as u32,
            protocol_version,
            operation,
            sequence::NORMAL,
        )
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use bililive_client::protocol::{Header, Operation, ProtocolVersion};
    ///
    /// let header = Header::for_payload(ProtocolVersion::Plain, Operation::Heartbeat, 0);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 16);
    /// assert_eq!(&bytes[..4], &[0, 0, 0, 16]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (16 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.total_length.to_be_bytes());
        buf[4..6].copy_from_slice(&self.header_length.to_be_bytes());
        buf[6..8].copy_from_slice(&u16::from(self.protocol_version).to_be_bytes());
        buf[8..12].copy_from_slice(&u32::from(self.operation).to_be_bytes());
        buf[12..16].copy_from_slice(&self.sequence.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use bililive_client::protocol::{Header, Operation, ProtocolVersion};
    ///
    /// let bytes = [0, 0, 0, 21, 0, 16, 0, 0, 0, 0, 0, 8, 0, 0, 0, 1];
    /// let header = Header::decode(&bytes).unwrap();
    /// assert_eq!(header.total_length, 21);
    /// assert_eq!(header.protocol_version, ProtocolVersion::Plain);
    /// assert_eq!(header.operation, Operation::AuthAccepted);
    /// assert_eq!(header.sequence, 1);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            total_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            header_length: u16::from_be_bytes([buf[4], buf[5]]),
            protocol_version: u16::from_be_bytes([buf[6], buf[7]]).into(),
            operation: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]).into(),
            sequence: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Number of payload bytes this header declares.
    ///
    /// Returns `None` when the lengths cannot describe a frame: a header
    /// shorter than 16 bytes, or a total length smaller than the header.
    #[inline]
    pub fn payload_length(&self) -> Option<usize> {
        if self.header_length < HEADER_LENGTH {
            return None;
        }
        self.total_length
            .checked_sub(u32::from(self.header_length))
            .map(|n| n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(42, ProtocolVersion::Brotli, Operation::Message, 7);
        let encoded = original.encode();
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let header = Header {
            total_length: 0x0102_0304,
            header_length: 0x0506,
            protocol_version: ProtocolVersion::Other(0x0708),
            operation: Operation::Other(0x090A_0B0C),
            sequence: 0x0D0E_0F10,
        };
        let bytes = header.encode();

        assert_eq!(
            bytes,
            [
                0x01, 0x02, 0x03, 0x04, // total length
                0x05, 0x06, // header length
                0x07, 0x08, // protocol version
                0x09, 0x0A, 0x0B, 0x0C, // operation
                0x0D, 0x0E, 0x0F, 0x10, // sequence
            ]
        );
    }

    #[test]
    fn test_header_size_is_exactly_16() {
        assert_eq!(HEADER_SIZE, 16);
        let header = Header::for_payload(ProtocolVersion::Plain, Operation::Heartbeat, 0);
        assert_eq!(header.encode().len(), 16);
        assert_eq!(header.total_length, 16);
        assert_eq!(header.header_length, 16);
        assert_eq!(header.sequence, sequence::NORMAL);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 15];
        assert!(Header::decode(&buf).is_none());
    }

    #[test]
    fn test_for_payload_counts_header() {
        let header = Header::for_payload(ProtocolVersion::Plain, Operation::Auth, 5);
        assert_eq!(header.total_length, 21);
        assert_eq!(header.payload_length(), Some(5));
    }

    #[test]
    fn test_payload_length_rejects_impossible_lengths() {
        let mut header = Header::new(10, ProtocolVersion::Plain, Operation::Plain, 0);
        assert_eq!(header.payload_length(), None);

        header.total_length = 32;
        header.header_length = 8;
        assert_eq!(header.payload_length(), None);

        header.header_length = 20;
        assert_eq!(header.payload_length(), Some(12));
    }

    #[test]
    fn test_protocol_version_codes() {
        for code in 0u16..6 {
            assert_eq!(u16::from(ProtocolVersion::from(code)), code);
        }
        assert_eq!(ProtocolVersion::from(2), ProtocolVersion::Zlib);
        assert_eq!(ProtocolVersion::from(3), ProtocolVersion::Brotli);
        assert!(ProtocolVersion::Zlib.is_compressed());
        assert!(!ProtocolVersion::PlainDefault.is_compressed());
        assert!(!ProtocolVersion::Other(9).is_compressed());
    }

    #[test]
    fn test_operation_codes() {
        let known = [
            (0, Operation::Plain),
            (1, Operation::PlainDefault),
            (2, Operation::Heartbeat),
            (3, Operation::HeartbeatReply),
            (5, Operation::Message),
            (7, Operation::Auth),
            (8, Operation::AuthAccepted),
        ];
        for (code, op) in known {
            assert_eq!(Operation::from(code), op);
            assert_eq!(u32::from(op), code);
        }
        assert_eq!(Operation::from(4), Operation::Other(4));
        assert_eq!(Operation::Other(4).to_string(), "unknown(4)");
    }
}
