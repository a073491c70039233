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

//! recordio is a record container file format and its reader/writer pair.
//!
//! A file is an append-only sequence of blocks. Each block carries a
//! checksummed header, a (possibly compressed) payload of length-prefixed
//! records, and a checksum trailer; there is no file-level header or
//! footer, so the format is self-describing per block. Writers only ever
//! append and never patch earlier bytes, which lets any number of readers
//! run concurrently with a single writer.
//!
//! Readers come in two shapes: whole-file, and "split" readers bound to a
//! byte range so that parallel scans can partition a file into disjoint,
//! record-complete shards. A reader can also opt into resuming from an
//! incomplete trailing block while a writer is still appending; see
//! [`reader::ReaderOptions`].
//!
//! # Example
//!
//! ```no_run
//! use recordio::{ReadPiece, ReaderOptions, RecordReader, RecordWriter};
//!
//! let mut writer = RecordWriter::create("data.rio").unwrap();
//! writer.write_record(b"hello, world").unwrap();
//! writer.close().unwrap();
//!
//! let mut reader = RecordReader::open("data.rio", ReaderOptions::default()).unwrap();
//! while let ReadPiece::Record(record) = reader.next_record().unwrap() {
//!     println!("{} byte record", record.len());
//! }
//! ```

pub mod block;
pub mod checksum;
pub mod compression;
pub mod constants;
pub mod error;
pub mod framing;
pub mod reader;
pub mod split;
pub mod writer;

// Re-exports for a cleaner API
pub use compression::CompressionCodec;
pub use error::{RecordIoError, Result};
pub use reader::{ReadPiece, ReaderOptions, RecordReader};
pub use writer::{RecordWriter, RecordWriterConfig};
