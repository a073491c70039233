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

//! Sequential and split record reader.
//!
//! The reader walks blocks in file order, validating each block's checksums
//! before yielding any of its records. A split reader is bound to a byte
//! range `[start, end)`: it starts at the first block boundary at or after
//! `start` and consumes every block whose first byte lies inside the range,
//! including a final block that extends past `end`. Contiguous disjoint
//! ranges therefore partition a file's fully-written blocks with no
//! duplication and no gap.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use log::{debug, warn};

use crate::block::{self, BlockHeader};
use crate::constants::{BLOCK_HEADER_SIZE, BLOCK_MAGIC, RESUME_LAST_INCOMPLETE_BLOCK};
use crate::error::{RecordIoError, Result};
use crate::framing::FrameCursor;

/// Options for a RecordReader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Re-attempt an incomplete trailing block on the next read call.
    ///
    /// When reading a file while a writer is appending to it, the reader may
    /// run into a block whose declared extent is longer than the bytes
    /// present. With this option set, such a block is reported as
    /// [`ReadPiece::Incomplete`] and the reader holds its position; the next
    /// call re-attempts from the same offset, picking up whatever the writer
    /// has flushed since. Callers are expected to back off between calls
    /// rather than spin.
    ///
    /// Use with caution: a truncated trailing block is bit-for-bit
    /// indistinguishable from a corrupt one, so this option trades
    /// corruption reporting for liveness. Only set it when a writer really
    /// is appending concurrently. Off by default: any short trailing block
    /// is then reported as corruption.
    pub resume_last_incomplete_block: bool,
}

impl ReaderOptions {
    /// Interprets a binding-layer flag word. Unknown bits are ignored, so
    /// strict corruption reporting stays the default.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            resume_last_incomplete_block: bits & RESUME_LAST_INCOMPLETE_BLOCK != 0,
        }
    }
}

/// Outcome of [`RecordReader::next_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPiece {
    /// The next record.
    Record(Bytes),

    /// Clean end of stream, or end of the split range.
    Eof,

    /// The trailing block is not fully written yet. Only surfaced when
    /// [`ReaderOptions::resume_last_incomplete_block`] is set; the next call
    /// re-attempts from the same position.
    Incomplete,
}

/// State of the reader between calls.
#[derive(Debug)]
enum ReaderState {
    /// At a block boundary, ready to read the next block.
    Positioned,

    /// Iterating the records of a decoded block.
    Reading(FrameCursor),

    /// Clean end of stream. Calls keep returning [`ReadPiece::Eof`].
    Exhausted,

    /// Corruption observed. Calls keep failing.
    Failed,
}

/// What reading the next block produced.
enum BlockOutcome {
    Decoded(FrameCursor),
    EndOfStream,
    Incomplete,
}

/// Reader for record container files.
///
/// # Example
///
/// ```no_run
/// use recordio::reader::{ReadPiece, ReaderOptions, RecordReader};
///
/// let mut reader = RecordReader::open("data.rio", ReaderOptions::default()).unwrap();
/// while let ReadPiece::Record(record) = reader.next_record().unwrap() {
///     println!("{} byte record", record.len());
/// }
/// ```
///
/// Any number of readers may be open concurrently with one writer; readers
/// only ever observe fully flushed bytes.
#[derive(Debug)]
pub struct RecordReader<Source: Read + Seek> {
    source: Source,
    options: ReaderOptions,

    /// Absolute offset of the next unread byte in the source.
    pos: u64,

    /// First offset past the split range; `u64::MAX` in whole-file mode.
    range_end: u64,

    state: ReaderState,
}

impl RecordReader<File> {
    /// Opens a record file for a whole-file read. A missing or unopenable
    /// file fails here, before any read call.
    pub fn open<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, options)
    }

    /// Opens a record file restricted to the byte range `[start, end)`.
    ///
    /// The reader scans forward from `start` for the first checksum-valid
    /// block header and consumes every block starting before `end`. A magic
    /// plus valid header checksum occurring by chance inside payload bytes
    /// is accepted as a boundary, a roughly 2^-32-per-offset event.
    pub fn open_split<P: AsRef<Path>>(
        path: P,
        options: ReaderOptions,
        start: u64,
        end: u64,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Self::with_range(file, options, start, end)
    }
}

impl<Source: Read + Seek> RecordReader<Source> {
    /// Creates a whole-file reader over an arbitrary source.
    pub fn new(source: Source, options: ReaderOptions) -> Result<Self> {
        Self::with_range(source, options, 0, u64::MAX)
    }

    /// Creates a reader bound to the byte range `[start, end)`.
    pub fn with_range(source: Source, options: ReaderOptions, start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(RecordIoError::InvalidSplitRange { start, end });
        }

        let mut reader = Self {
            source,
            options,
            pos: 0,
            range_end: end,
            state: ReaderState::Positioned,
        };

        if start == 0 {
            // Offset 0 is a block boundary by construction.
            reader.source.seek(SeekFrom::Start(0))?;
        } else {
            reader.seek_to_boundary(start)?;
        }

        Ok(reader)
    }

    /// Reads the next record, crossing block boundaries transparently.
    pub fn next_record(&mut self) -> Result<ReadPiece> {
        loop {
            match &mut self.state {
                ReaderState::Failed => return Err(RecordIoError::ReaderFailed),

                ReaderState::Exhausted => return Ok(ReadPiece::Eof),

                ReaderState::Reading(frames) => match frames.next_frame() {
                    Ok(Some(record)) => return Ok(ReadPiece::Record(record)),
                    Ok(None) => self.state = ReaderState::Positioned,
                    Err(err) => {
                        // The payload passed its block checksum, so a
                        // framing error here means a malformed writer.
                        self.state = ReaderState::Failed;
                        return Err(err);
                    }
                },

                ReaderState::Positioned => match self.read_block() {
                    Ok(BlockOutcome::Decoded(frames)) => {
                        self.state = ReaderState::Reading(frames);
                    }
                    Ok(BlockOutcome::EndOfStream) => {
                        // With the resume option the reader holds position
                        // so blocks appended after a clean EOF are still
                        // picked up by later calls.
                        if !self.options.resume_last_incomplete_block {
                            self.state = ReaderState::Exhausted;
                        }
                        return Ok(ReadPiece::Eof);
                    }
                    Ok(BlockOutcome::Incomplete) => return Ok(ReadPiece::Incomplete),
                    Err(err) => {
                        self.state = ReaderState::Failed;
                        return Err(err);
                    }
                },
            }
        }
    }

    /// Current absolute offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Reads and validates the block at the current position.
    fn read_block(&mut self) -> Result<BlockOutcome> {
        if self.pos >= self.range_end {
            debug!("split range exhausted at offset {}", self.pos);
            return Ok(BlockOutcome::EndOfStream);
        }

        let block_start = self.pos;

        let mut header_bytes = [0u8; BLOCK_HEADER_SIZE];
        let got = read_fully(&mut self.source, &mut header_bytes)?;
        self.pos += got as u64;

        if got == 0 {
            return Ok(BlockOutcome::EndOfStream);
        }
        if got < BLOCK_HEADER_SIZE {
            return self.short_tail(
                block_start,
                format!(
                    "{} byte(s) of a {}-byte block header at offset {}",
                    got, BLOCK_HEADER_SIZE, block_start
                ),
            );
        }

        let header = BlockHeader::parse(&header_bytes, block_start)?;

        let mut body = vec![0u8; header.body_len()];
        let got = read_fully(&mut self.source, &mut body)?;
        self.pos += got as u64;

        if got < body.len() {
            return self.short_tail(
                block_start,
                format!(
                    "block at offset {} declares {} body byte(s) but only {} are present",
                    block_start,
                    body.len(),
                    got
                ),
            );
        }

        let payload = block::decode_payload(&header, &header_bytes, &body, block_start)?;
        debug!(
            "decoded block at offset {}: {} payload byte(s)",
            block_start,
            payload.len()
        );

        Ok(BlockOutcome::Decoded(FrameCursor::new(payload)))
    }

    /// Handles a trailing block with fewer bytes than its declared extent.
    /// Rewinds to the block start either way: for a later re-attempt under
    /// the resume option, or so `position` reports where reading stopped.
    fn short_tail(&mut self, block_start: u64, detail: String) -> Result<BlockOutcome> {
        self.rewind_to(block_start)?;

        if self.options.resume_last_incomplete_block {
            debug!("incomplete trailing block: {}", detail);
            Ok(BlockOutcome::Incomplete)
        } else {
            // Without out-of-band knowledge of an active writer this cannot
            // be told apart from corruption, and is reported as such.
            warn!("truncated block: {}", detail);
            Err(RecordIoError::TruncatedBlock(detail))
        }
    }

    fn rewind_to(&mut self, offset: u64) -> Result<()> {
        self.source.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Scans forward from `start` for the first complete, checksum-valid
    /// block header before `range_end` and positions the reader on it.
    /// Reaching end of file or range first leaves the reader exhausted.
    fn seek_to_boundary(&mut self, start: u64) -> Result<()> {
        const SCAN_CHUNK: usize = 8 * 1024;

        self.source.seek(SeekFrom::Start(start))?;
        self.pos = start;

        // Window of file bytes starting at absolute offset `window_base`.
        let mut window: Vec<u8> = Vec::with_capacity(SCAN_CHUNK + BLOCK_HEADER_SIZE);
        let mut window_base = start;
        // Index into `window` from which candidates are still unexamined.
        let mut search_from = 0usize;
        let mut at_eof = false;

        loop {
            // Examine every candidate magic position currently in the window.
            while let Some(found) = find_magic(&window[search_from..]) {
                let candidate = search_from + found;
                let candidate_abs = window_base + candidate as u64;

                if candidate_abs >= self.range_end {
                    debug!(
                        "no block boundary inside split range [{}, {})",
                        start, self.range_end
                    );
                    self.state = ReaderState::Exhausted;
                    return Ok(());
                }

                // Pull in the rest of the header if the window ends short.
                while window.len() < candidate + BLOCK_HEADER_SIZE && !at_eof {
                    at_eof = fill_window(&mut self.source, &mut window, SCAN_CHUNK)?;
                }
                if window.len() < candidate + BLOCK_HEADER_SIZE {
                    // The magic sits so close to EOF that no complete header
                    // follows; there is no boundary to position on.
                    self.state = ReaderState::Exhausted;
                    return Ok(());
                }

                let mut header_bytes = [0u8; BLOCK_HEADER_SIZE];
                header_bytes.copy_from_slice(&window[candidate..candidate + BLOCK_HEADER_SIZE]);
                match BlockHeader::parse(&header_bytes, candidate_abs) {
                    Ok(_) => {
                        if candidate_abs > start {
                            debug!(
                                "split start {} resynced to block boundary at {}",
                                start, candidate_abs
                            );
                        }
                        return self.rewind_to(candidate_abs);
                    }
                    Err(_) => {
                        // A stray magic inside payload bytes; keep scanning.
                        search_from = candidate + 1;
                    }
                }
            }

            if at_eof {
                debug!("no block boundary at or after offset {}", start);
                self.state = ReaderState::Exhausted;
                return Ok(());
            }

            // Drop examined bytes, keeping enough tail for a magic that
            // straddles the refill boundary.
            let keep_from = window.len().saturating_sub(BLOCK_MAGIC.len() - 1).max(search_from);
            window.drain(..keep_from);
            window_base += keep_from as u64;
            search_from = 0;

            if window_base >= self.range_end {
                self.state = ReaderState::Exhausted;
                return Ok(());
            }

            at_eof = fill_window(&mut self.source, &mut window, SCAN_CHUNK)?;
        }
    }
}

/// Records from a reader as a plain iterator.
///
/// Iteration ends at [`ReadPiece::Eof`] and also at [`ReadPiece::Incomplete`];
/// use [`RecordReader::next_record`] directly for resumable tail reads. A
/// read error is yielded once, after which the iterator is finished.
impl<Source: Read + Seek> Iterator for RecordReader<Source> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(ReadPiece::Record(record)) => Some(Ok(record)),
            Ok(ReadPiece::Eof) | Ok(ReadPiece::Incomplete) => None,
            // The failure itself was already yielded on a previous call.
            Err(RecordIoError::ReaderFailed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Reads until `buf` is full or EOF; returns how many bytes were read.
fn read_fully<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecordIoError::Io(e)),
        }
    }
    Ok(filled)
}

/// Reads up to `chunk` more bytes into `window`; true once EOF is reached.
fn fill_window<R: Read>(source: &mut R, window: &mut Vec<u8>, chunk: usize) -> Result<bool> {
    let old_len = window.len();
    window.resize(old_len + chunk, 0);
    let got = read_fully(source, &mut window[old_len..])?;
    window.truncate(old_len + got);
    Ok(got < chunk)
}

/// Position of the first block magic in `haystack`, if any.
fn find_magic(haystack: &[u8]) -> Option<usize> {
    if haystack.len() < BLOCK_MAGIC.len() {
        return None;
    }
    haystack
        .windows(BLOCK_MAGIC.len())
        .position(|window| window == BLOCK_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::writer::RecordWriter;

    fn written(records: &[&[u8]]) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        for record in records {
            writer.write_record(record).unwrap();
        }
        writer.close().unwrap();
        writer.get_ref().clone()
    }

    #[test]
    fn test_empty_source_is_clean_eof() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()), ReaderOptions::default()).unwrap();
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
        // Repeated calls stay at Eof.
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
    }

    #[test]
    fn test_hello_world_scenario() {
        let binary: [u8; 17] = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xff, 0xfe, 0xfd, 0xfc, 0xfb,
            0xfa, 0xf9, 0xf8,
        ];
        let bytes = written(&[b"hello, world", &binary]);

        let mut reader = RecordReader::new(Cursor::new(bytes), ReaderOptions::default()).unwrap();
        match reader.next_record().unwrap() {
            ReadPiece::Record(record) => assert_eq!(&record[..], b"hello, world"),
            other => panic!("Expected first record, got {:?}", other),
        }
        match reader.next_record().unwrap() {
            ReadPiece::Record(record) => assert_eq!(&record[..], &binary[..]),
            other => panic!("Expected second record, got {:?}", other),
        }
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
    }

    #[test]
    fn test_iterator_collects_all_records() {
        let bytes = written(&[b"one", b"two", b"three"]);
        let reader = RecordReader::new(Cursor::new(bytes), ReaderOptions::default()).unwrap();

        let records: Vec<Bytes> = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][..], b"one");
        assert_eq!(&records[2][..], b"three");
    }

    #[test]
    fn test_truncated_tail_without_resume_is_corruption() {
        let bytes = written(&[b"a record"]);
        let truncated = bytes[..bytes.len() - 3].to_vec();

        let mut reader =
            RecordReader::new(Cursor::new(truncated), ReaderOptions::default()).unwrap();
        match reader.next_record() {
            Err(err) => assert!(err.is_corruption(), "unexpected error class: {:?}", err),
            other => panic!("Expected corruption error, got {:?}", other),
        }
        // The reader is now failed for good.
        match reader.next_record() {
            Err(RecordIoError::ReaderFailed) => {}
            other => panic!("Expected ReaderFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_tail_with_resume_is_incomplete() {
        let bytes = written(&[b"a record"]);
        let truncated = bytes[..bytes.len() - 3].to_vec();

        let options = ReaderOptions::from_bits(RESUME_LAST_INCOMPLETE_BLOCK);
        let mut reader = RecordReader::new(Cursor::new(truncated), options).unwrap();
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Incomplete);
        // No forward progress between attempts.
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Incomplete);
    }

    #[test]
    fn test_option_bits() {
        assert!(!ReaderOptions::from_bits(0).resume_last_incomplete_block);
        assert!(ReaderOptions::from_bits(RESUME_LAST_INCOMPLETE_BLOCK).resume_last_incomplete_block);
        // Reserved bits default to off behavior.
        assert!(!ReaderOptions::from_bits(0x0001).resume_last_incomplete_block);
        assert!(ReaderOptions::from_bits(0xffff).resume_last_incomplete_block);
    }

    #[test]
    fn test_invalid_split_range() {
        let result = RecordReader::with_range(
            Cursor::new(Vec::new()),
            ReaderOptions::default(),
            10,
            5,
        );
        assert!(matches!(result, Err(RecordIoError::InvalidSplitRange { .. })));
    }

    #[test]
    fn test_split_resync_skips_into_next_block() {
        // Two blocks; a range starting inside the first must resync to the
        // second and yield only its records.
        let mut writer = RecordWriter::new(Vec::new());
        writer.write_record(b"block one record").unwrap();
        writer.flush().unwrap();
        let first_block_len = writer.get_ref().len() as u64;
        writer.write_record(b"block two record").unwrap();
        writer.close().unwrap();
        let bytes = writer.get_ref().clone();

        let mut reader = RecordReader::with_range(
            Cursor::new(bytes),
            ReaderOptions::default(),
            1,
            u64::MAX,
        )
        .unwrap();
        assert_eq!(reader.position(), first_block_len);
        match reader.next_record().unwrap() {
            ReadPiece::Record(record) => assert_eq!(&record[..], b"block two record"),
            other => panic!("Expected second block's record, got {:?}", other),
        }
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
    }

    #[test]
    fn test_split_range_with_no_boundary() {
        let bytes = written(&[b"only block"]);
        // A range entirely inside the single block resyncs past it to EOF.
        let mut reader = RecordReader::with_range(
            Cursor::new(bytes.clone()),
            ReaderOptions::default(),
            1,
            bytes.len() as u64,
        )
        .unwrap();
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
    }
}
