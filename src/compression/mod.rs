//! Pluggable per-block compression.
//!
//! The codec id is persisted in every block header, so a reader needs no
//! writer-side configuration and a single file may mix codecs. Codec id 0
//! (no compression) is always available.

use bytes::Bytes;

use crate::constants::CODEC_ID_NONE;
#[cfg(feature = "zstd")]
use crate::constants::CODEC_ID_ZSTD;
use crate::error::{RecordIoError, Result};

#[cfg(feature = "zstd")]
pub(crate) mod zstd;

/// Compression codec applied to a block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionCodec {
    /// Identity codec; the payload is stored as-is.
    #[default]
    None,

    /// Zstd compression.
    #[cfg(feature = "zstd")]
    Zstd,
}

impl CompressionCodec {
    /// The codec id persisted in block headers.
    pub fn id(&self) -> u8 {
        match self {
            CompressionCodec::None => CODEC_ID_NONE,
            #[cfg(feature = "zstd")]
            CompressionCodec::Zstd => CODEC_ID_ZSTD,
        }
    }

    /// Resolves a persisted codec id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            CODEC_ID_NONE => Ok(CompressionCodec::None),
            #[cfg(feature = "zstd")]
            CODEC_ID_ZSTD => Ok(CompressionCodec::Zstd),
            other => Err(RecordIoError::UnsupportedCompressionCodec(other)),
        }
    }
}

/// Compresses a block payload with the given codec.
pub fn compress(codec: CompressionCodec, data: &[u8]) -> Result<Bytes> {
    match codec {
        CompressionCodec::None => Ok(Bytes::copy_from_slice(data)),
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => self::zstd::compress(data),
    }
}

/// Decompresses a stored block payload. `expected_len` is the uncompressed
/// length declared in the block header; any other output length is an error.
pub fn decompress(codec: CompressionCodec, data: &[u8], expected_len: usize) -> Result<Bytes> {
    match codec {
        CompressionCodec::None => {
            if data.len() != expected_len {
                return Err(RecordIoError::DecompressedLengthMismatch {
                    expected: expected_len,
                    actual: data.len(),
                });
            }
            Ok(Bytes::copy_from_slice(data))
        }
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => self::zstd::decompress(data, expected_len),
    }
}
