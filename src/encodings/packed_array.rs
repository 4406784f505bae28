// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A compact in-memory array of small non-negative integers, used to buffer
//! repetition/definition levels before they are run through
//! the hybrid RLE codec at flush time. Distinct from that hybrid codec —
//! this is plain bit-packing with no run-length step, sized once to a fixed
//! bit-width and appended to incrementally.

use crate::errors::Result;
use crate::util::bit_util::{ceil8, pack8_i32, unpack8_i32};

#[derive(Clone, Default)]
pub struct PackedArray {
    width: usize,
    packed: Vec<u8>,
    scratch: [i32; 8],
    scratch_len: usize,
    // total logical element count, including scratched-but-unflushed ones.
    count: usize,
}

impl PackedArray {
    pub fn new() -> Self {
        PackedArray { width: 0, packed: Vec::new(), scratch: [0; 8], scratch_len: 0, count: 0 }
    }

    /// Clears all state and records the new bit-width (0..=32).
    pub fn reset(&mut self, width: usize) {
        assert!(width <= 32);
        self.width = width;
        self.packed.clear();
        self.scratch = [0; 8];
        self.scratch_len = 0;
        self.count = 0;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Buffers `v` in the 8-element scratch; flushes a packed group once
    /// full. `v` must fit in `width` bits — the caller, not this type,
    /// enforces that.
    pub fn append(&mut self, v: i32) {
        self.scratch[self.scratch_len] = v;
        self.scratch_len += 1;
        self.count += 1;
        if self.scratch_len == 8 {
            self.flush_scratch();
        }
    }

    fn flush_scratch(&mut self) {
        if self.width == 0 {
            self.scratch_len = 0;
            return;
        }
        self.packed.extend_from_slice(&pack8_i32(self.width, &self.scratch));
        self.scratch = [0; 8];
        self.scratch_len = 0;
    }

    /// Zero-pads any partial group and packs it. Idempotent.
    pub fn flush(&mut self) {
        if self.scratch_len > 0 {
            self.flush_scratch();
        }
    }

    /// Returns the `i`-th logical element. `w = 0` always returns 0.
    pub fn at(&self, i: usize) -> Result<i32> {
        if i >= self.count {
            return Err(general_err!("PackedArray index {} out of range ({})", i, self.count));
        }
        if self.width == 0 {
            return Ok(0);
        }
        let flushed_groups = self.packed.len() / ceil8(self.width);
        let flushed_count = flushed_groups * 8;
        if i < flushed_count {
            let group_idx = i / 8;
            let offset_in_group = i % 8;
            let group_bytes = ceil8(self.width);
            let bytes = &self.packed[group_idx * group_bytes..(group_idx + 1) * group_bytes];
            let unpacked = unpack8_i32(self.width, bytes);
            Ok(unpacked[offset_in_group])
        } else {
            Ok(self.scratch[i - flushed_count])
        }
    }

    /// Appends every element of `other` (which must share this array's
    /// width) one at a time.
    pub fn append_array(&mut self, other: &PackedArray) -> Result<()> {
        if other.width != self.width {
            return Err(general_err!(
                "Cannot append PackedArray of width {} to width {}",
                other.width,
                self.width
            ));
        }
        for i in 0..other.count() {
            self.append(other.at(i)?);
        }
        Ok(())
    }

    /// Writes the backing buffer verbatim. The caller must have called
    /// `flush()` first; this does not flush implicitly so that callers who
    /// want the exact packed-so-far bytes (e.g. for incremental inspection)
    /// can choose not to pad.
    pub fn write(&self, sink: &mut Vec<u8>) {
        sink.extend_from_slice(&self.packed);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_array_roundtrip() {
        let mut arr = PackedArray::new();
        arr.reset(3);
        let values: Vec<i32> = (0..20).map(|i| i % 8).collect();
        for &v in &values {
            arr.append(v);
        }
        arr.flush();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(arr.at(i).unwrap(), v);
        }
    }

    #[test]
    fn test_packed_array_width_zero() {
        let mut arr = PackedArray::new();
        arr.reset(0);
        for _ in 0..5 {
            arr.append(0);
        }
        assert_eq!(arr.count(), 5);
        assert_eq!(arr.as_bytes().len(), 0);
        assert_eq!(arr.at(3).unwrap(), 0);
    }

    #[test]
    fn test_packed_array_out_of_range() {
        let mut arr = PackedArray::new();
        arr.reset(2);
        arr.append(1);
        assert!(arr.at(5).is_err());
    }

    #[test]
    fn test_packed_array_append_array() {
        let mut a = PackedArray::new();
        a.reset(4);
        for v in [1, 2, 3] {
            a.append(v);
        }
        let mut b = PackedArray::new();
        b.reset(4);
        for v in [4, 5] {
            b.append(v);
        }
        a.append_array(&b).unwrap();
        a.flush();
        let expected = [1, 2, 3, 4, 5];
        for (i, &v) in expected.iter().enumerate() {
            assert_eq!(a.at(i).unwrap(), v);
        }
    }
}
