//! Zstd compression support, using the zstd-rs bulk API.

use bytes::Bytes;

use crate::error::{RecordIoError, Result};

/// Compression level used for block payloads. Level 3 is the usual balance
/// of ratio and speed for small blocks.
const COMPRESSION_LEVEL: i32 = 3;

pub(crate) fn compress(data: &[u8]) -> Result<Bytes> {
    zstd::bulk::compress(data, COMPRESSION_LEVEL)
        .map(Bytes::from)
        .map_err(|e| RecordIoError::CompressionFailed(e.to_string()))
}

pub(crate) fn decompress(data: &[u8], expected_len: usize) -> Result<Bytes> {
    let decompressed = zstd::bulk::decompress(data, expected_len)
        .map_err(|e| RecordIoError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != expected_len {
        return Err(RecordIoError::DecompressedLengthMismatch {
            expected: expected_len,
            actual: decompressed.len(),
        });
    }

    Ok(Bytes::from(decompressed))
}
