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

//! Split planning for parallel scans.

/// Partitions `[0, file_len)` into at most `num_shards` contiguous,
/// disjoint ranges for [`crate::reader::RecordReader::open_split`].
///
/// The cut points need not fall on block boundaries: split readers resync
/// to the next boundary themselves, and a block straddling a cut belongs to
/// the range holding its first byte. Reading the returned ranges therefore
/// yields every record of the file exactly once, in file order when shard
/// outputs are concatenated in range order.
pub fn partition(file_len: u64, num_shards: usize) -> Vec<(u64, u64)> {
    if file_len == 0 || num_shards == 0 {
        return Vec::new();
    }

    let shards = num_shards as u64;
    let base = file_len / shards;
    let remainder = file_len % shards;

    let mut ranges = Vec::with_capacity(num_shards);
    let mut start = 0u64;
    for shard in 0..shards {
        let len = base + u64::from(shard < remainder);
        if len == 0 {
            // More shards than bytes; the rest would be empty.
            break;
        }
        ranges.push((start, start + len));
        start += len;
    }
    ranges
}
