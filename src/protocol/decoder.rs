//! Lazy decoder for a buffer of frames.
//!
//! A single WebSocket message carries one or more frames back to back. Frames
//! whose protocol version names a compression algorithm carry, once
//! decompressed, another buffer of frames (which may be compressed again).
//! [`decode`] walks all of it and yields only uncompressed frames, in order.
//!
//! Incomplete data is not an error: a trailing partial header or a frame
//! declaring more bytes than remain ends the buffer it sits in. Corrupt
//! compressed payloads are errors.
//!
//! # Example
//!
//! ```
//! use bililive_client::protocol::{decode, Frame};
//!
//! let mut data = Frame::heartbeat().encode();
//! data.extend_from_slice(&Frame::heartbeat().encode());
//! data.extend_from_slice(&[0, 0]); // partial header, ignored
//!
//! let frames: Vec<Frame> = decode(data).collect::<Result<_, _>>().unwrap();
//! assert_eq!(frames.len(), 2);
//! ```

use std::iter::FusedIterator;

use bytes::Bytes;

use super::wire_format::Header;
use super::Frame;
use crate::error::Result;

/// Decode every frame in `data`, expanding compressed envelopes.
pub fn decode(data: impl Into<Bytes>) -> Frames {
    Frames {
        pending: vec![data.into()],
    }
}

/// Decode every frame in `data` into a vector.
///
/// Stops at the first decompression error.
pub fn decode_all(data: impl Into<Bytes>) -> Result<Vec<Frame>> {
    decode(data).collect()
}

/// Iterator returned by [`decode`].
///
/// Nested buffers are kept on an explicit stack: the top is the innermost
/// buffer being scanned, and an outer buffer only resumes once every buffer
/// above it is exhausted.
#[derive(Debug, Clone)]
pub struct Frames {
    pending: Vec<Bytes>,
}

impl Frames {
    /// Check if every buffer has been consumed.
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for Frames {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let buf = self.pending.last_mut()?;

            let Some(header) = Header::decode(buf) else {
                self.pending.pop();
                continue;
            };

            let Some(payload_len) = header.payload_length() else {
                tracing::debug!(
                    total_length = header.total_length,
                    header_length = header.header_length,
                    "unframeable header, dropping rest of buffer"
                );
                self.pending.pop();
                continue;
            };

            let header_len = usize::from(header.header_length);
            let frame_len = header_len + payload_len;
            if buf.len() < frame_len {
                self.pending.pop();
                continue;
            }

            let mut frame_bytes = buf.split_to(frame_len);
            let payload = frame_bytes.split_off(header_len);

            let Some(algorithm) = header.protocol_version.compression() else {
                return Some(Ok(Frame::from_parts(header, payload)));
            };

            match algorithm.decompress(&payload) {
                Ok(inner) => self.pending.push(Bytes::from(inner)),
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl FusedIterator for Frames {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::LiveError;
    use crate::protocol::{
        build_frame, sequence, Compression, Operation, ProtocolVersion, HEADER_SIZE,
    };

    fn message(body: &str) -> Frame {
        Frame::new(
            ProtocolVersion::Plain,
            Operation::Message,
            Bytes::copy_from_slice(body.as_bytes()),
        )
    }

    fn concat(frames: &[Frame]) -> Vec<u8> {
        frames.iter().flat_map(Frame::encode).collect()
    }

    #[test]
    fn test_auth_accepted_scenario() {
        let mut data = vec![0, 0, 0, 21, 0, 16, 0, 0, 0, 0, 0, 8, 0, 0, 0, 1];
        data.extend_from_slice(b"hello");

        let frames = decode_all(data).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].operation(), Operation::AuthAccepted);
        assert_eq!(frames[0].sequence(), sequence::DEFAULT);
        assert_eq!(frames[0].payload(), b"hello");
    }

    #[test]
    fn test_multiple_plain_frames() {
        let frames = [message("first"), message("second"), Frame::heartbeat()];
        let decoded = decode_all(concat(&frames)).unwrap();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn test_empty_buffer() {
        let mut frames = decode(Vec::new());
        assert!(frames.next().is_none());
        assert!(frames.is_finished());
    }

    #[test]
    fn test_truncated_header_dropped() {
        let mut data = message("complete").encode();
        data.extend_from_slice(&message("cut").encode()[..HEADER_SIZE - 1]);

        let decoded = decode_all(data).unwrap();
        assert_eq!(decoded, vec![message("complete")]);
    }

    #[test]
    fn test_truncated_payload_dropped() {
        let mut data = message("complete").encode();
        let partial = message("cut short");
        data.extend_from_slice(&partial.encode()[..HEADER_SIZE + 3]);

        let decoded = decode_all(data).unwrap();
        assert_eq!(decoded, vec![message("complete")]);
    }

    #[test]
    fn test_total_length_below_header_stops() {
        let mut data = vec![0, 0, 0, 4, 0, 16, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0];
        data.extend_from_slice(&message("never reached").encode());
        assert!(decode_all(data).unwrap().is_empty());
    }

    #[test]
    fn test_long_header_is_skipped() {
        // header_length = 20: four extra header bytes before the payload
        let mut data = vec![0, 0, 0, 23, 0, 20, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0];
        data.extend_from_slice(&[0xEE; 4]);
        data.extend_from_slice(b"abc");

        let decoded = decode_all(data).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].payload(), b"abc");
    }

    #[test]
    fn test_long_header_past_end_stops() {
        let data = vec![0, 0, 0, 40, 0, 32, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 1, 2];
        assert!(decode_all(data).unwrap().is_empty());
    }

    #[test]
    fn test_zlib_envelope_expands_in_order() {
        let inner = [message("a"), message("b"), message("c")];
        let envelope = Frame::compressed(Compression::Zlib, &inner).unwrap();

        let decoded = decode_all(envelope.encode()).unwrap();
        assert_eq!(decoded, inner);
    }

    #[test]
    fn test_brotli_envelope_expands_in_order() {
        let inner = [message("a"), Frame::heartbeat(), message("c")];
        let envelope = Frame::compressed(Compression::Brotli, &inner).unwrap();

        let decoded = decode_all(envelope.encode()).unwrap();
        assert_eq!(decoded, inner);
    }

    #[test]
    fn test_nested_envelopes_precede_outer_frames() {
        let innermost = Frame::compressed(Compression::Zlib, &[message("2"), message("3")]).unwrap();
        let middle = Frame::compressed(Compression::Brotli, &[message("1"), innermost, message("4")])
            .unwrap();
        let outer = [message("0"), middle, message("5")];

        let decoded = decode_all(concat(&outer)).unwrap();
        let bodies: Vec<&[u8]> = decoded.iter().map(Frame::payload).collect();
        let expected: [&[u8]; 6] = [b"0", b"1", b"2", b"3", b"4", b"5"];
        assert_eq!(bodies, expected);
    }

    #[test]
    fn test_empty_envelope_yields_nothing() {
        let envelope = Frame::compressed(Compression::Brotli, &[]).unwrap();
        let mut data = envelope.encode();
        data.extend_from_slice(&message("after").encode());

        let decoded = decode_all(data).unwrap();
        assert_eq!(decoded, vec![message("after")]);
    }

    #[test]
    fn test_corrupt_envelope_is_error() {
        let mut data = message("before").encode();
        data.extend(build_frame(
            ProtocolVersion::Zlib,
            Operation::Message,
            b"not zlib at all",
        ));
        data.extend_from_slice(&message("after").encode());

        let mut frames = decode(data);
        assert_eq!(frames.next().unwrap().unwrap(), message("before"));
        assert!(matches!(
            frames.next(),
            Some(Err(LiveError::Decompress {
                algorithm: Compression::Zlib,
                ..
            }))
        ));
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_unknown_version_treated_as_plain() {
        let data = build_frame(ProtocolVersion::Other(9), Operation::Message, b"raw");
        let decoded = decode_all(data).unwrap();
        assert_eq!(decoded[0].protocol_version(), ProtocolVersion::Other(9));
        assert_eq!(decoded[0].payload(), b"raw");
    }

    #[test]
    fn test_decoding_is_lazy() {
        let envelope = Frame::compressed(Compression::Zlib, &[message("x")]).unwrap();
        let mut data = message("first").encode();
        data.extend(envelope.encode());

        let mut frames = decode(data);
        assert_eq!(frames.next().unwrap().unwrap(), message("first"));
        assert!(!frames.is_finished());
    }

    proptest! {
        // Frame strategy lives with the Arbitrary impl in frame.rs
        #[test]
        fn test_cut_yields_fully_contained_frames(
            (frames, cut) in proptest::collection::vec(any::<Frame>(), 0..8)
                .prop_flat_map(|frames| {
                    let len = concat(&frames).len();
                    (Just(frames), 0..=len)
                })
        ) {
            let data = concat(&frames);
            let mut end = 0;
            let expected: Vec<Frame> = frames
                .into_iter()
                .take_while(|frame| {
                    end += frame.encoded_len();
                    end <= cut
                })
                .collect();

            let decoded = decode_all(data[..cut].to_vec()).expect("plain frames decode");
            prop_assert_eq!(decoded, expected);
        }
    }
}
