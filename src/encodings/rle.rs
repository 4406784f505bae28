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

//! The hybrid RLE / bit-packed codec. A run is a varint header followed by
//! either an RLE payload (one value repeated `count` times, `ceil(w/8)`
//! little-endian bytes) or a bit-packed payload (`groups` groups of eight
//! `w`-bit values, via `pack8`).
//!
//! The maximum bit-packed run is 63 groups (504 values) — the largest count
//! that fits in a one-byte header once the continuation/LSB bit is
//! accounted for.

use crate::errors::Result;
use crate::util::bit_util::{
    ceil8, pack8_i64, read_le_int, unpack8_i64, write_le_int, BitReader,
};
use crate::util::memory::ByteBufferPtr;

const MAX_GROUPS_PER_RUN: usize = 63;

/// Value types that a hybrid-codec batch read can materialize into. Levels
/// are read as `i16`, dictionary indices as whatever the dictionary's
/// native index width warrants.
pub trait FromRleValue: Copy + Default {
    fn from_u64(v: u64) -> Self;
}

impl FromRleValue for i16 {
    fn from_u64(v: u64) -> Self {
        v as i16
    }
}
impl FromRleValue for i32 {
    fn from_u64(v: u64) -> Self {
        v as i32
    }
}
impl FromRleValue for i64 {
    fn from_u64(v: u64) -> Self {
        v as i64
    }
}
impl FromRleValue for u32 {
    fn from_u64(v: u64) -> Self {
        v as u32
    }
}
impl FromRleValue for u64 {
    fn from_u64(v: u64) -> Self {
        v
    }
}
impl FromRleValue for bool {
    fn from_u64(v: u64) -> Self {
        v != 0
    }
}

/// Encodes a stream of non-negative integers bounded by `2^bit_width`.
/// Buffers every appended value in memory; the run-splitting happens once,
/// at `flush_buffer()`, rather than incrementally per `put()` — the wire
/// output is identical to a streaming encoder, only the internal staging
/// differs (this crate doesn't need the memory-boundedness a true streaming
/// writer buys you, since column stores already hold a whole row group's
/// worth of levels in memory).
pub struct RleEncoder {
    bit_width: usize,
    values: Vec<u64>,
}

impl RleEncoder {
    pub fn new(bit_width: usize) -> Self {
        RleEncoder { bit_width, values: Vec::new() }
    }

    pub fn put(&mut self, value: u64) {
        self.values.push(value);
    }

    pub fn put_batch(&mut self, values: &[u64]) {
        self.values.extend_from_slice(values);
    }

    /// Runs the encoder's state machine over every buffered value and
    /// returns the encoded bytes, resetting the value buffer (bit width is
    /// retained for reuse).
    pub fn flush_buffer(&mut self) -> Vec<u8> {
        let values = std::mem::take(&mut self.values);
        encode_hybrid(&values, self.bit_width)
    }
}

fn encode_hybrid(values: &[u64], bit_width: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let n = values.len();
    let mut i = 0;
    while i < n {
        let run_len = run_length_at(values, i);
        if run_len >= 8 {
            write_rle_run(&mut out, values[i], run_len, bit_width);
            i += run_len;
            continue;
        }

        let mut bp_values: Vec<u64> = Vec::new();
        while i < n && bp_values.len() < MAX_GROUPS_PER_RUN * 8 {
            let run = run_length_at(values, i);
            if run >= 8 {
                break;
            }
            let take = std::cmp::min(run, MAX_GROUPS_PER_RUN * 8 - bp_values.len());
            for _ in 0..take {
                bp_values.push(values[i]);
            }
            i += take;
            if take < run {
                break;
            }
        }
        write_bit_packed_run(&mut out, &bp_values, bit_width);
    }
    out
}

fn run_length_at(values: &[u64], i: usize) -> usize {
    let mut j = i + 1;
    while j < values.len() && values[j] == values[i] {
        j += 1;
    }
    j - i
}

fn write_rle_run(out: &mut Vec<u8>, value: u64, count: usize, bit_width: usize) {
    write_header(out, count, false);
    let nbytes = ceil8(bit_width);
    if nbytes > 0 {
        out.extend_from_slice(&write_le_int(value, nbytes));
    }
}

fn write_bit_packed_run(out: &mut Vec<u8>, values: &[u64], bit_width: usize) {
    if values.is_empty() {
        return;
    }
    let groups = (values.len() + 7) / 8;
    write_header(out, groups, true);
    for g in 0..groups {
        let mut group = [0i64; 8];
        for k in 0..8 {
            let idx = g * 8 + k;
            if idx < values.len() {
                group[k] = values[idx] as i64;
            }
        }
        out.extend_from_slice(&pack8_i64(bit_width, &group));
    }
}

fn write_header(out: &mut Vec<u8>, count_or_groups: usize, bit_packed: bool) {
    let header = ((count_or_groups as u64) << 1) | (bit_packed as u64);
    write_uvarint(out, header);
}

fn write_uvarint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let mut byte = (v & 0x7F) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
}

/// Decodes a hybrid RLE/bit-packed stream. `set_data` takes ownership of
/// the whole remaining buffer; the decoder stops at the first run boundary
/// once it has dispensed as many values as the caller has asked for (EOF at
/// a run boundary is a clean end, EOF mid-run is fatal).
pub struct RleDecoder {
    bit_width: usize,
    bit_reader: Option<BitReader>,
    rle_left: usize,
    rle_value: u64,
    bp_group: [u64; 8],
    bp_left_in_group: usize,
    pending_bit_packed_groups: usize,
}

impl RleDecoder {
    pub fn new(bit_width: u8) -> Self {
        RleDecoder {
            bit_width: bit_width as usize,
            bit_reader: None,
            rle_left: 0,
            rle_value: 0,
            bp_group: [0; 8],
            bp_left_in_group: 0,
            pending_bit_packed_groups: 0,
        }
    }

    pub fn set_data(&mut self, data: ByteBufferPtr) {
        self.bit_reader = Some(BitReader::new(data));
        self.rle_left = 0;
        self.bp_left_in_group = 0;
        self.pending_bit_packed_groups = 0;
    }

    /// Reads a 4-byte little-endian length prefix, then binds the decoder
    /// to exactly that many following bytes ("init-with-size") — used
    /// wherever the container does not otherwise bound the stream.
    /// Returns the number of bytes consumed, including the 4-byte prefix.
    pub fn set_data_with_length_prefix(&mut self, data: ByteBufferPtr) -> Result<usize> {
        if data.len() < 4 {
            return Err(eof_err!("Not enough bytes for hybrid codec length prefix"));
        }
        let len = read_le_int(data.range(0, 4).as_ref(), 4) as usize;
        if data.len() < 4 + len {
            return Err(eof_err!("Truncated hybrid codec stream: need {} bytes", len));
        }
        self.set_data(data.range(4, len));
        Ok(4 + len)
    }

    fn refill_run(&mut self) -> Result<bool> {
        let reader = self.bit_reader.as_mut().expect("set_data must be called first");
        let header = match reader.get_vlq_int() {
            Some(h) => h as u64,
            None => return Ok(false),
        };
        if header == 0 {
            return Err(general_err!("Malformed hybrid run: empty run (header = 0)"));
        }
        if header & 1 == 0 {
            let count = (header >> 1) as usize;
            let nbytes = ceil8(self.bit_width);
            let value = if nbytes > 0 {
                reader
                    .get_aligned_u64(nbytes)
                    .ok_or_else(|| eof_err!("Truncated RLE run value"))?
            } else {
                0
            };
            self.rle_left = count;
            self.rle_value = value;
        } else {
            let groups = (header >> 1) as usize;
            if groups == 0 {
                return Err(general_err!("Malformed hybrid run: zero bit-packed groups"));
            }
            // Values are dispensed one group at a time via `get_batch`.
            self.rle_left = 0;
            self.bp_left_in_group = 0;
            self.pending_bit_packed_groups = groups;
        }
        Ok(true)
    }

    /// Reads up to `buffer.len()` values, stopping early (returning the
    /// count actually read) at end of stream. EOF mid-run propagates as a
    /// fatal error from the caller's subsequent use of `values_left`
    /// bookkeeping — this function itself just reports what it managed.
    pub fn get_batch<T: FromRleValue>(&mut self, buffer: &mut [T]) -> Result<usize> {
        let mut out_i = 0;
        while out_i < buffer.len() {
            if self.rle_left > 0 {
                let take = std::cmp::min(self.rle_left, buffer.len() - out_i);
                for k in 0..take {
                    buffer[out_i + k] = T::from_u64(self.rle_value);
                }
                out_i += take;
                self.rle_left -= take;
                continue;
            }
            if self.bp_left_in_group > 0 {
                let start = 8 - self.bp_left_in_group;
                let take = std::cmp::min(self.bp_left_in_group, buffer.len() - out_i);
                for k in 0..take {
                    buffer[out_i + k] = T::from_u64(self.bp_group[start + k]);
                }
                out_i += take;
                self.bp_left_in_group -= take;
                continue;
            }
            if self.pending_bit_packed_groups > 0 {
                let reader = self.bit_reader.as_mut().unwrap();
                let nbytes = ceil8(self.bit_width);
                if self.bit_width == 0 {
                    self.bp_group = [0; 8];
                } else {
                    let bytes = reader
                        .get_aligned_bytes(nbytes)
                        .ok_or_else(|| eof_err!("Truncated bit-packed group"))?;
                    let group = unpack8_i64(self.bit_width, bytes.as_ref());
                    for k in 0..8 {
                        self.bp_group[k] = group[k] as u64;
                    }
                }
                self.bp_left_in_group = 8;
                self.pending_bit_packed_groups -= 1;
                continue;
            }
            if !self.refill_run()? {
                break;
            }
        }
        Ok(out_i)
    }

    /// Reads indices via `get_batch` and maps them through `dict`.
    pub fn get_batch_with_dict<T: Clone + Default>(
        &mut self,
        dict: &[T],
        buffer: &mut [T],
        max_values: usize,
    ) -> Result<usize> {
        let n = std::cmp::min(max_values, buffer.len());
        let mut indices = vec![0u32; n];
        let read = self.get_batch(&mut indices)?;
        for i in 0..read {
            let idx = indices[i] as usize;
            if idx >= dict.len() {
                return Err(general_err!(
                    "Dictionary index {} out of range (dictionary has {} entries)",
                    idx,
                    dict.len()
                ));
            }
            buffer[i] = dict[idx].clone();
        }
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(values: &[u64], bit_width: usize) -> Vec<u64> {
        let mut encoder = RleEncoder::new(bit_width);
        encoder.put_batch(values);
        let bytes = encoder.flush_buffer();
        let mut decoder = RleDecoder::new(bit_width as u8);
        decoder.set_data(ByteBufferPtr::new(bytes));
        let mut out = vec![0u64; values.len()];
        let n = decoder.get_batch(&mut out).unwrap();
        assert_eq!(n, values.len());
        out
    }

    #[test]
    fn test_rle_pure_run() {
        // width 3: 100 copies of 4, then 100 copies of 5.
        let mut values = vec![4u64; 100];
        values.extend(vec![5u64; 100]);
        let mut encoder = RleEncoder::new(3);
        encoder.put_batch(&values);
        let bytes = encoder.flush_buffer();
        // header = 200 << 1 = 400 -> two-byte varint; first byte 0x90, second 0x03.
        assert_eq!(bytes[0], 0x90);
        assert_eq!(bytes[1], 0x03);
        assert_eq!(bytes[2], 0x04);
        assert_eq!(roundtrip(&values, 3), values);
    }

    #[test]
    fn test_bit_packed_pure_run() {
        // width 3, values cycling 0,1,2,... with period 3: no run ever
        // reaches length 8, so the whole 100-value stream packs into one run.
        let values: Vec<u64> = (0..100).map(|i| (i % 3) as u64).collect();
        let mut encoder = RleEncoder::new(3);
        encoder.put_batch(&values);
        let bytes = encoder.flush_buffer();
        // groups = ceil(100/8) = 13; header = (13<<1)|1 = 27.
        assert_eq!(bytes[0], 27);
        assert_eq!(roundtrip(&values, 3), values);
    }

    #[test]
    fn test_bit_packed_run_caps_at_63_groups() {
        let values: Vec<u64> = (0..504).map(|i| (i % 3) as u64).collect();
        let mut extended = values.clone();
        extended.push(99); // breaks the cycle and forces a second run
        let mut encoder = RleEncoder::new(7);
        encoder.put_batch(&extended);
        let bytes = encoder.flush_buffer();
        assert_eq!(bytes[0], (63 << 1) | 1);
        assert_eq!(roundtrip(&extended, 7), extended);
    }

    #[test]
    fn test_width_zero_all_default() {
        let values = vec![0u64; 10];
        let mut encoder = RleEncoder::new(0);
        encoder.put_batch(&values);
        let bytes = encoder.flush_buffer();
        assert_eq!(bytes[0], 20); // header = 10 << 1
        assert_eq!(bytes.len(), 1); // no payload bytes for width 0
        assert_eq!(roundtrip(&values, 0), values);
    }

    #[test]
    fn test_mixed_runs_roundtrip() {
        let mut values = vec![1u64; 9];
        values.extend((0..20).map(|i| (i % 5) as u64));
        values.extend(vec![7u64; 12]);
        assert_eq!(roundtrip(&values, 4), values);
    }

    #[test]
    fn test_set_data_with_length_prefix() {
        let mut encoder = RleEncoder::new(2);
        encoder.put_batch(&[1, 1, 1, 1, 1, 1, 1, 1, 1]);
        let payload = encoder.flush_buffer();
        let mut framed = Vec::new();
        framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        framed.extend_from_slice(&payload);
        framed.push(0xAB); // trailing byte that must not be consumed

        let mut decoder = RleDecoder::new(2);
        let consumed = decoder
            .set_data_with_length_prefix(ByteBufferPtr::new(framed))
            .unwrap();
        assert_eq!(consumed, 4 + payload.len());
        let mut out = vec![0u64; 9];
        assert_eq!(decoder.get_batch(&mut out).unwrap(), 9);
        assert_eq!(out, vec![1u64; 9]);
    }
}
