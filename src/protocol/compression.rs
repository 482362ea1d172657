//! zlib and brotli support for compressed envelope frames.
//!
//! The server batches application messages into one frame whose payload is a
//! compressed buffer of further frames. Protocol version 2 is zlib, 3 is
//! brotli (the version this client asks for when authenticating).

use std::fmt;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{LiveError, Result};

/// Brotli decoder/encoder internal buffer size.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Brotli quality used when building envelopes.
const BROTLI_QUALITY: u32 = 5;

/// Brotli window size (log2) used when building envelopes.
const BROTLI_LG_WINDOW: u32 = 22;

/// Compression algorithm of an envelope frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// zlib (RFC 1950) stream.
    Zlib,
    /// brotli (RFC 7932) stream.
    Brotli,
}

impl Compression {
    /// Decompress a whole payload.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Decompress`] if the payload is not a valid stream
    /// for this algorithm.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 4);
        let res = match self {
            Self::Zlib => ZlibDecoder::new(data).read_to_end(&mut out),
            Self::Brotli => brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE).read_to_end(&mut out),
        };
        match res {
            Ok(_) => Ok(out),
            Err(source) => Err(LiveError::Decompress {
                algorithm: self,
                source,
            }),
        }
    }

    /// Compress a whole payload.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Self::Brotli => {
                let mut out = Vec::new();
                {
                    let mut writer = brotli::CompressorWriter::new(
                        &mut out,
                        BROTLI_BUFFER_SIZE,
                        BROTLI_QUALITY,
                        BROTLI_LG_WINDOW,
                    );
                    writer.write_all(data)?;
                    writer.flush()?;
                }
                Ok(out)
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zlib => f.write_str("zlib"),
            Self::Brotli => f.write_str("brotli"),
        }
    }
}
