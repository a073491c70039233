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

//! Length-prefix framing of records inside a block payload.
//!
//! A decompressed block payload is a flat sequence of frames, each a u32
//! little-endian length followed by that many record bytes. A payload that
//! ends exactly on a frame boundary is valid; ending inside a length prefix
//! or a record body is a framing error.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::LENGTH_PREFIX_SIZE;
use crate::error::{RecordIoError, Result};

/// Appends one framed record to a payload under construction.
pub fn append_frame(payload: &mut BytesMut, record: &[u8]) {
    payload.put_u32_le(record.len() as u32);
    payload.extend_from_slice(record);
}

/// Lazy cursor over the frames of a decompressed block payload.
///
/// The cursor is cheap to construct, so restarting iteration is just
/// building a new cursor over the same payload. Frames come out in the
/// order they were appended.
#[derive(Debug, Clone)]
pub struct FrameCursor {
    payload: Bytes,
}

impl FrameCursor {
    /// Creates a cursor over a decompressed block payload.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Returns the next record, `None` when the payload is cleanly consumed,
    /// or a framing error if the payload ends mid-frame.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.payload.is_empty() {
            return Ok(None);
        }

        if self.payload.len() < LENGTH_PREFIX_SIZE {
            return Err(RecordIoError::TruncatedRecord(format!(
                "payload ends {} byte(s) into a length prefix",
                self.payload.len()
            )));
        }

        let len = self.payload.get_u32_le() as usize;
        if self.payload.len() < len {
            return Err(RecordIoError::TruncatedRecord(format!(
                "record body needs {} byte(s) but only {} remain",
                len,
                self.payload.len()
            )));
        }

        Ok(Some(self.payload.split_to(len)))
    }
}
