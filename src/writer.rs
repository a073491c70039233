// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sequential record writer.
//!
//! Records accumulate in an in-memory block payload. When the payload
//! reaches the configured size threshold, the block is compressed,
//! checksummed and appended to the sink in a single write; a new block is
//! then opened. Records are only visible to readers once their block has
//! been flushed (by the threshold, an explicit [`RecordWriter::flush`], or
//! close), because visibility requires a valid block trailer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use bytes::BytesMut;
use log::trace;

use crate::block;
use crate::compression::CompressionCodec;
use crate::constants::{
    DEFAULT_BLOCK_SIZE_BYTES, LENGTH_PREFIX_SIZE, MAX_BLOCK_PAYLOAD, MAX_RECORD_SIZE,
};
use crate::error::{RecordIoError, Result};
use crate::framing;

/// Configuration options for a RecordWriter.
#[derive(Debug, Clone)]
pub struct RecordWriterConfig {
    /// Compression codec requested for block payloads. Blocks that do not
    /// shrink under it are stored uncompressed; readers never need to know.
    pub compression_codec: CompressionCodec,

    /// Uncompressed payload size at which the open block is flushed. This is
    /// a threshold, not a cap: a single record larger than it still lands in
    /// one (oversized) block, since records never span blocks.
    pub block_size_bytes: usize,
}

impl Default for RecordWriterConfig {
    fn default() -> Self {
        Self {
            compression_codec: CompressionCodec::None,
            block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES,
        }
    }
}

#[derive(Debug, PartialEq)]
enum WriterState {
    Open,
    Closed,
}

/// Writer for record container files.
///
/// # Example
///
/// ```no_run
/// use recordio::writer::RecordWriter;
///
/// let mut writer = RecordWriter::create("data.rio").unwrap();
/// writer.write_record(b"hello, world").unwrap();
/// writer.write_record(b"another record").unwrap();
/// writer.close().unwrap();
/// ```
///
/// Exactly one writer may append to a given file at a time; the format
/// provides no locking of its own.
pub struct RecordWriter<Sink: Write> {
    sink: Sink,
    config: RecordWriterConfig,

    /// Framed records accumulated for the open block.
    payload: BytesMut,

    /// Records in the open block, not yet flushed.
    pending_records: u64,

    state: WriterState,
}

impl RecordWriter<File> {
    /// Creates (or truncates) a record file at `path` with default
    /// configuration. I/O failures surface here, not on the first write.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_config(path, RecordWriterConfig::default())
    }

    /// Creates (or truncates) a record file at `path`.
    pub fn create_with_config<P: AsRef<Path>>(path: P, config: RecordWriterConfig) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_config(file, config))
    }

    /// Opens a record file for appending, creating it if absent. The format
    /// is self-describing per block, so appending needs no inspection of the
    /// bytes already present.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::append_with_config(path, RecordWriterConfig::default())
    }

    /// Opens a record file for appending with custom configuration.
    pub fn append_with_config<P: AsRef<Path>>(path: P, config: RecordWriterConfig) -> Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self::with_config(file, config))
    }
}

impl<Sink: Write> RecordWriter<Sink> {
    /// Creates a writer over an arbitrary sink with default configuration.
    pub fn new(sink: Sink) -> Self {
        Self::with_config(sink, RecordWriterConfig::default())
    }

    /// Creates a writer over an arbitrary sink.
    pub fn with_config(sink: Sink, config: RecordWriterConfig) -> Self {
        let payload = BytesMut::with_capacity(config.block_size_bytes + LENGTH_PREFIX_SIZE);
        Self {
            sink,
            config,
            payload,
            pending_records: 0,
            state: WriterState::Open,
        }
    }

    /// Appends one record.
    ///
    /// The record joins the open block; the block is flushed once its
    /// accumulated payload reaches the configured threshold. On error the
    /// writer must be considered unusable and reopened.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        if self.state == WriterState::Closed {
            return Err(RecordIoError::WritingClosedFile);
        }
        if record.len() > MAX_RECORD_SIZE {
            return Err(RecordIoError::RecordTooLarge(record.len()));
        }

        // Flush first if sharing the open block would overflow its u32
        // length fields.
        if !self.payload.is_empty()
            && self.payload.len() + LENGTH_PREFIX_SIZE + record.len() > MAX_BLOCK_PAYLOAD
        {
            self.flush_block()?;
        }

        framing::append_frame(&mut self.payload, record);
        self.pending_records += 1;

        if self.payload.len() >= self.config.block_size_bytes {
            self.flush_block()?;
        }

        Ok(())
    }

    /// Encodes the open block and appends it to the sink, even if it is
    /// under the size threshold. A no-op when no records are pending.
    fn flush_block(&mut self) -> Result<()> {
        if self.pending_records == 0 {
            return Ok(());
        }

        let block = block::encode_block(&self.payload, self.config.compression_codec)?;
        self.sink.write_all(&block)?;

        trace!(
            "flushed block: {} record(s), {} payload byte(s), {} byte(s) on disk",
            self.pending_records,
            self.payload.len(),
            block.len()
        );

        self.payload.clear();
        self.pending_records = 0;
        Ok(())
    }

    /// Forces the current (possibly partial) block out and flushes the sink.
    ///
    /// Readers can only observe the records written so far after this (or
    /// [`RecordWriter::close`]) returns successfully.
    pub fn flush(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        self.flush_block()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes any pending records and closes the writer. Further writes
    /// fail; closing again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        self.flush()?;
        self.state = WriterState::Closed;
        Ok(())
    }

    /// Gets a reference to the underlying sink.
    pub fn get_ref(&self) -> &Sink {
        &self.sink
    }
}

impl<Sink: Write> Drop for RecordWriter<Sink> {
    fn drop(&mut self) {
        // Best-effort flush; errors cannot be reported from drop.
        if self.state != WriterState::Closed {
            let _ = self.flush();
        }
    }
}
