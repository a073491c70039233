//! The block codec: pure transforms between framed-record payloads and
//! on-disk blocks. No I/O happens here.
//!
//! Block layout, all integers little-endian:
//!
//! ```text
//! +-------+-------+------------------+-------------+------------+---------+-----------+
//! | magic | codec | uncompressed_len | payload_len | header_crc | payload | block_crc |
//! |  (4)  |  (1)  |       (4)        |     (4)     |    (4)     |   (n)   |    (4)    |
//! +-------+-------+------------------+-------------+------------+---------+-----------+
//! ```
//!
//! - `header_crc` covers the 13 bytes before it, so a split reader can
//!   validate a candidate boundary without reading the payload.
//! - `block_crc` covers the whole header plus the stored payload.

use bytes::{BufMut, Bytes, BytesMut};
#[cfg(feature = "zstd")]
use log::debug;

use crate::checksum::{checksum, checksum_concat};
use crate::compression::{self, CompressionCodec};
use crate::constants::{BLOCK_HEADER_SIZE, BLOCK_MAGIC, BLOCK_TRAILER_SIZE, MAX_BLOCK_PAYLOAD};
use crate::error::{RecordIoError, Result};

/// Parsed form of the fixed-width block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Persisted compression codec id.
    pub codec_id: u8,
    /// Payload length after decompression.
    pub uncompressed_len: u32,
    /// Stored (possibly compressed) payload length.
    pub payload_len: u32,
}

impl BlockHeader {
    /// Parses and validates a block header. `offset` is the header's file
    /// position, used only for error reporting.
    pub fn parse(bytes: &[u8; BLOCK_HEADER_SIZE], offset: u64) -> Result<Self> {
        if bytes[0..4] != BLOCK_MAGIC {
            return Err(RecordIoError::BadBlockMagic { offset });
        }

        let stored_crc = u32::from_le_bytes([bytes[13], bytes[14], bytes[15], bytes[16]]);
        if checksum(&bytes[0..13]) != stored_crc {
            return Err(RecordIoError::HeaderChecksumMismatch { offset });
        }

        Ok(Self {
            codec_id: bytes[4],
            uncompressed_len: u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
            payload_len: u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]),
        })
    }

    /// Bytes the block occupies after the header: stored payload + trailer.
    pub fn body_len(&self) -> usize {
        self.payload_len as usize + BLOCK_TRAILER_SIZE
    }

    /// Total bytes the block occupies on disk.
    pub fn block_len(&self) -> usize {
        BLOCK_HEADER_SIZE + self.body_len()
    }
}

/// Encodes one block from a framed-records payload.
///
/// When the requested codec does not actually shrink the payload, the block
/// is stored uncompressed with codec id 0. The codec id is per block, so
/// readers handle mixed files transparently.
pub fn encode_block(payload: &[u8], codec: CompressionCodec) -> Result<Bytes> {
    if payload.len() > MAX_BLOCK_PAYLOAD {
        return Err(RecordIoError::Other(format!(
            "block payload of {} bytes exceeds the format's u32 length fields",
            payload.len()
        )));
    }

    let compressed: Option<Bytes> = match codec {
        CompressionCodec::None => None,
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => {
            let compressed = compression::compress(codec, payload)?;
            if compressed.len() < payload.len() {
                Some(compressed)
            } else {
                debug!(
                    "payload of {} byte(s) did not shrink under {:?}; storing uncompressed",
                    payload.len(),
                    codec
                );
                None
            }
        }
    };

    let (codec_id, stored): (u8, &[u8]) = match &compressed {
        Some(bytes) => (codec.id(), bytes.as_ref()),
        None => (CompressionCodec::None.id(), payload),
    };

    let mut block = BytesMut::with_capacity(BLOCK_HEADER_SIZE + stored.len() + BLOCK_TRAILER_SIZE);
    block.extend_from_slice(&BLOCK_MAGIC);
    block.put_u8(codec_id);
    block.put_u32_le(payload.len() as u32);
    block.put_u32_le(stored.len() as u32);

    let header_crc = checksum(&block);
    block.put_u32_le(header_crc);

    block.extend_from_slice(stored);

    let block_crc = checksum(&block);
    block.put_u32_le(block_crc);

    Ok(block.freeze())
}

/// Validates a block body against its parsed header and recovers the
/// decompressed payload.
///
/// `header_bytes` are the raw header as read from disk and `body` is exactly
/// `header.body_len()` bytes: the stored payload followed by the trailer.
/// `offset` is the block's file position, for error reporting.
pub fn decode_payload(
    header: &BlockHeader,
    header_bytes: &[u8; BLOCK_HEADER_SIZE],
    body: &[u8],
    offset: u64,
) -> Result<Bytes> {
    debug_assert_eq!(body.len(), header.body_len());

    let payload = &body[..header.payload_len as usize];
    let trailer = &body[header.payload_len as usize..];
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);

    if checksum_concat(header_bytes, payload) != stored_crc {
        return Err(RecordIoError::BlockChecksumMismatch { offset });
    }

    let codec = CompressionCodec::from_id(header.codec_id)?;
    compression::decompress(codec, payload, header.uncompressed_len as usize)
}
