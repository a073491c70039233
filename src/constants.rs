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

//! Constants of the record container format.

/// Magic byte sequence marking the start of every block header.
///
/// The leading non-ASCII byte keeps the marker from showing up in ordinary
/// text payloads by accident.
pub const BLOCK_MAGIC: [u8; 4] = [0x8b, b'r', b'i', b'o'];

/// Size of a block header in bytes: 4 magic + 1 codec id + 4 uncompressed
/// length + 4 stored payload length + 4 header checksum.
pub const BLOCK_HEADER_SIZE: usize = 17;

/// Size of the block checksum trailer in bytes.
pub const BLOCK_TRAILER_SIZE: usize = 4;

/// Smallest possible block: a header and a trailer around an empty payload.
pub const MIN_BLOCK_SIZE: usize = BLOCK_HEADER_SIZE + BLOCK_TRAILER_SIZE;

/// Width of the per-record length prefix inside a block payload.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Uncompressed payload size at which a writer flushes its open block.
pub const DEFAULT_BLOCK_SIZE_BYTES: usize = 32 * 1024;

/// Upper bound on a block's uncompressed payload, fixed by the u32 length
/// fields in the header.
pub const MAX_BLOCK_PAYLOAD: usize = u32::MAX as usize;

/// Upper bound on a single record: it must fit in one block payload together
/// with its length prefix.
pub const MAX_RECORD_SIZE: usize = MAX_BLOCK_PAYLOAD - LENGTH_PREFIX_SIZE;

/// Reader option bit: re-attempt an incomplete trailing block on the next
/// read call instead of failing. See [`crate::reader::ReaderOptions`].
pub const RESUME_LAST_INCOMPLETE_BLOCK: u32 = 0x0002;

/// Compression codec id: no compression. Mandatory for interoperability.
pub const CODEC_ID_NONE: u8 = 0;

/// Compression codec id: zstd.
pub const CODEC_ID_ZSTD: u8 = 1;
