//! Error types for the record container format.

use std::io;
use thiserror::Error;

/// The main error type for record container operations.
#[derive(Debug, Error)]
pub enum RecordIoError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bytes at a supposed block boundary do not start with the block magic.
    #[error("Bad block magic at offset {offset}")]
    BadBlockMagic { offset: u64 },

    /// A block header's own checksum does not match its fields.
    #[error("Block header checksum mismatch at offset {offset}")]
    HeaderChecksumMismatch { offset: u64 },

    /// The block trailer checksum does not match the header and payload bytes.
    #[error("Block checksum mismatch at offset {offset}")]
    BlockChecksumMismatch { offset: u64 },

    /// A block's declared extent runs past the end of the available bytes.
    /// Without the resume option this cannot be told apart from corruption.
    #[error("Truncated block: {0}")]
    TruncatedBlock(String),

    /// A block payload ends in the middle of a record frame.
    #[error("Truncated record frame: {0}")]
    TruncatedRecord(String),

    /// The block names a compression codec this build does not understand.
    #[error("Unsupported compression codec id: {0}")]
    UnsupportedCompressionCodec(u8),

    /// Compressing a block payload failed.
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// Decompressing a block payload failed.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// The decompressed payload does not have the length the header declares.
    #[error("Decompressed length mismatch: expected {expected}, got {actual}")]
    DecompressedLengthMismatch { expected: usize, actual: usize },

    /// The record is too large for the u32 length fields of the format.
    #[error("Record of {0} bytes exceeds the maximum record size")]
    RecordTooLarge(usize),

    /// Attempted to write through a closed writer.
    #[error("Writing a closed file")]
    WritingClosedFile,

    /// The reader observed corruption earlier and will not make progress.
    #[error("Reader has failed; reopen to read again")]
    ReaderFailed,

    /// A split range with start past end.
    #[error("Invalid split range: start {start} is past end {end}")]
    InvalidSplitRange { start: u64, end: u64 },

    /// A general error occurred.
    #[error("{0}")]
    Other(String),
}

impl RecordIoError {
    /// True for errors that mean the bytes on disk are damaged (or truncated
    /// while the resume option is off), as opposed to plain I/O failures or
    /// caller mistakes.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            RecordIoError::BadBlockMagic { .. }
                | RecordIoError::HeaderChecksumMismatch { .. }
                | RecordIoError::BlockChecksumMismatch { .. }
                | RecordIoError::TruncatedBlock(_)
                | RecordIoError::TruncatedRecord(_)
                | RecordIoError::DecompressionFailed(_)
                | RecordIoError::DecompressedLengthMismatch { .. }
        )
    }
}

/// A specialized Result type for record container operations.
pub type Result<T> = std::result::Result<T, RecordIoError>;
