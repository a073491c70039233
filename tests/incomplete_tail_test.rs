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

//! Behavior around a half-written trailing block, with and without the
//! resume option, simulating a reader running concurrently with a writer.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tempfile::tempdir;

use recordio::constants::RESUME_LAST_INCOMPLETE_BLOCK;
use recordio::{ReadPiece, ReaderOptions, RecordReader, RecordIoError, RecordWriter};

/// Writes two single-record blocks, then truncates the file a few bytes
/// into the second block. Returns the bytes that were cut off.
fn half_write_second_block(path: &Path) -> Vec<u8> {
    let mut writer = RecordWriter::create(path).unwrap();
    writer.write_record(b"record A").unwrap();
    writer.flush().unwrap();
    let first_block_len = std::fs::metadata(path).unwrap().len();

    writer.write_record(b"record B").unwrap();
    writer.close().unwrap();

    let full = std::fs::read(path).unwrap();
    let cut = first_block_len as usize + 5;
    assert!(cut < full.len(), "second block must be longer than the cut");

    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(cut as u64).unwrap();

    full[cut..].to_vec()
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
}

#[test]
fn test_resume_picks_up_the_completed_block() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("resumed.rio");
    let remainder = half_write_second_block(&path);

    let options = ReaderOptions::from_bits(RESUME_LAST_INCOMPLETE_BLOCK);
    let mut reader = RecordReader::open(&path, options).unwrap();

    // The complete first block reads normally.
    match reader.next_record().unwrap() {
        ReadPiece::Record(record) => assert_eq!(&record[..], b"record A"),
        other => panic!("Expected record A, got {:?}", other),
    }

    // The half-written tail is incomplete, not corrupt, and the reader
    // makes no forward progress while it stays that way.
    let stalled_at = reader.position();
    for _ in 0..5 {
        assert_eq!(reader.next_record().unwrap(), ReadPiece::Incomplete);
        assert_eq!(reader.position(), stalled_at);
    }

    // The "writer" finishes the block; the same reader continues.
    append_bytes(&path, &remainder);
    match reader.next_record().unwrap() {
        ReadPiece::Record(record) => assert_eq!(&record[..], b"record B"),
        other => panic!("Expected record B after completion, got {:?}", other),
    }
    assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
}

#[test]
fn test_resume_also_survives_a_clean_eof() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("growing.rio");

    let mut writer = RecordWriter::create(&path).unwrap();
    writer.write_record(b"before the pause").unwrap();
    writer.flush().unwrap();

    let options = ReaderOptions::from_bits(RESUME_LAST_INCOMPLETE_BLOCK);
    let mut reader = RecordReader::open(&path, options).unwrap();
    match reader.next_record().unwrap() {
        ReadPiece::Record(record) => assert_eq!(&record[..], b"before the pause"),
        other => panic!("Expected the first record, got {:?}", other),
    }
    assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);

    // The writer appends a whole new block after the reader saw EOF.
    writer.write_record(b"after the pause").unwrap();
    writer.close().unwrap();

    match reader.next_record().unwrap() {
        ReadPiece::Record(record) => assert_eq!(&record[..], b"after the pause"),
        other => panic!("Expected the appended record, got {:?}", other),
    }
    assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
}

#[test]
fn test_without_resume_a_short_tail_is_terminal_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("strict.rio");
    half_write_second_block(&path);

    let mut reader = RecordReader::open(&path, ReaderOptions::default()).unwrap();

    match reader.next_record().unwrap() {
        ReadPiece::Record(record) => assert_eq!(&record[..], b"record A"),
        other => panic!("Expected record A, got {:?}", other),
    }

    // Indistinguishable from corruption without the option.
    match reader.next_record() {
        Err(err) => assert!(err.is_corruption(), "unexpected error class: {:?}", err),
        other => panic!("Expected a corruption error, got {:?}", other),
    }

    // The failure is terminal.
    for _ in 0..3 {
        match reader.next_record() {
            Err(RecordIoError::ReaderFailed) => {}
            other => panic!("Expected ReaderFailed, got {:?}", other),
        }
    }
}

#[test]
fn test_without_resume_eof_is_terminal_even_if_the_file_grows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("static_eof.rio");

    let mut writer = RecordWriter::create(&path).unwrap();
    writer.write_record(b"only record").unwrap();
    writer.flush().unwrap();

    let mut reader = RecordReader::open(&path, ReaderOptions::default()).unwrap();
    assert!(matches!(
        reader.next_record().unwrap(),
        ReadPiece::Record(_)
    ));
    assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);

    writer.write_record(b"appended later").unwrap();
    writer.close().unwrap();

    // A strict reader stays exhausted.
    assert_eq!(reader.next_record().unwrap(), ReadPiece::Eof);
}
