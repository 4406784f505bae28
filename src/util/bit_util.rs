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

//! Bit-pack primitives and varint helpers, plus the `BitReader`/`BitWriter`
//! bit-level cursors that the hybrid RLE codec and the delta-binary-packed
//! codec are built on.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::memory::ByteBufferPtr;

// Pack8/unpack8 tables for widths 0..=32 (u32 lanes) and 0..=64 (u64 lanes),
// generated at build time (see build.rs) rather than hand-written 33 + 65
// times over.
include!(concat!(env!("OUT_DIR"), "/bit_pack_tables.rs"));

/// Packs eight i32 values at bit-width `w` (0..=32). Returns exactly
/// `ceil(w/8)` bytes; width 0 returns no bytes.
pub fn pack8_i32(w: usize, input: &[i32; 8]) -> Vec<u8> {
    assert!(w <= 32);
    let u: [u32; 8] = [
        input[0] as u32, input[1] as u32, input[2] as u32, input[3] as u32,
        input[4] as u32, input[5] as u32, input[6] as u32, input[7] as u32,
    ];
    let mut out = vec![0u8; (w * 8 + 7) / 8];
    let n = PACK8_U32[w](&u, &mut out);
    out.truncate(n);
    out
}

/// Unpacks eight i32 values from a `w`-byte-group-aligned buffer. Width 0
/// consumes nothing and returns eight zeros.
pub fn unpack8_i32(w: usize, bytes: &[u8]) -> [i32; 8] {
    assert!(w <= 32);
    let mut out = [0u32; 8];
    UNPACK8_U32[w](bytes, &mut out);
    [
        out[0] as i32, out[1] as i32, out[2] as i32, out[3] as i32,
        out[4] as i32, out[5] as i32, out[6] as i32, out[7] as i32,
    ]
}

/// As `pack8_i32` but for 64-bit lanes (widths 0..=64).
pub fn pack8_i64(w: usize, input: &[i64; 8]) -> Vec<u8> {
    assert!(w <= 64);
    let u: [u64; 8] = [
        input[0] as u64, input[1] as u64, input[2] as u64, input[3] as u64,
        input[4] as u64, input[5] as u64, input[6] as u64, input[7] as u64,
    ];
    let mut out = vec![0u8; (w * 8 + 7) / 8];
    let n = PACK8_U64[w](&u, &mut out);
    out.truncate(n);
    out
}

pub fn unpack8_i64(w: usize, bytes: &[u8]) -> [i64; 8] {
    assert!(w <= 64);
    let mut out = [0u64; 8];
    UNPACK8_U64[w](bytes, &mut out);
    [
        out[0] as i64, out[1] as i64, out[2] as i64, out[3] as i64,
        out[4] as i64, out[5] as i64, out[6] as i64, out[7] as i64,
    ]
}

/// Number of bits needed to represent values in `[0, n]`, i.e. `ceil(log2(n + 1))`.
/// Used to size the repetition/definition level packed-arrays from maxR/maxD.
pub fn num_required_bits(n: u64) -> usize {
    let mut bits = 0;
    let mut v = n;
    while v != 0 {
        bits += 1;
        v >>= 1;
    }
    bits
}

/// Bytes needed to hold `w` bits, per the hybrid codec's RLE payload width
/// (`ceil(w / 8)`).
#[inline]
pub fn ceil8(w: usize) -> usize {
    (w + 7) / 8
}

/// Reads a little-endian unsigned integer occupying exactly `num_bytes` of
/// `buf` (1..=8). Used by the hybrid codec for RLE run values and by the
/// plain codecs for fixed-width ints.
pub fn read_le_int(buf: &[u8], num_bytes: usize) -> u64 {
    if num_bytes == 0 {
        return 0;
    }
    let mut cursor = &buf[..num_bytes];
    cursor.read_uint::<LittleEndian>(num_bytes).expect("buf must hold num_bytes bytes")
}

/// Writes `v`'s low `num_bytes` bytes (1..=8) in little-endian order.
pub fn write_le_int(v: u64, num_bytes: usize) -> Vec<u8> {
    if num_bytes == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(num_bytes);
    out.write_uint::<LittleEndian>(v, num_bytes).expect("Vec<u8> writes never fail");
    out
}

/// Bit-level cursor over an owned byte buffer, used to read the varint
/// headers, RLE/bit-packed runs and delta miniblocks.
pub struct BitReader {
    buffer: ByteBufferPtr,
    byte_offset: usize,
    bit_offset: usize,
}

impl BitReader {
    pub fn new(buffer: ByteBufferPtr) -> Self {
        BitReader { buffer, byte_offset: 0, bit_offset: 0 }
    }

    pub fn from(v: Vec<u8>) -> Self {
        Self::new(ByteBufferPtr::new(v))
    }

    /// Current read position, in bytes, rounded down. Only meaningful when
    /// called at a byte boundary (callers assert this, matching the
    /// teacher's `get_offset()` contract).
    pub fn get_byte_offset(&self) -> usize {
        self.byte_offset + if self.bit_offset > 0 { 1 } else { 0 }
    }

    fn remaining_bits(&self) -> usize {
        (self.buffer.len() - self.byte_offset) * 8 - self.bit_offset
    }

    /// Reads `num_bits` (0..=64) and returns them as a `u64`. Bit 0 of the
    /// result is the LSB of the first unread byte (little-endian-at-the-bit
    /// level).
    pub fn get_value_u64(&mut self, num_bits: usize) -> Option<u64> {
        if num_bits == 0 {
            return Some(0);
        }
        if self.remaining_bits() < num_bits {
            return None;
        }
        let mut result: u64 = 0;
        let mut bits_read = 0;
        while bits_read < num_bits {
            let byte = self.buffer[self.byte_offset] as u64;
            let bits_left_in_byte = 8 - self.bit_offset;
            let bits_to_take = std::cmp::min(bits_left_in_byte, num_bits - bits_read);
            let mask = if bits_to_take == 64 { u64::MAX } else { (1u64 << bits_to_take) - 1 };
            let chunk = (byte >> self.bit_offset) & mask;
            result |= chunk << bits_read;
            bits_read += bits_to_take;
            self.bit_offset += bits_to_take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        Some(result)
    }

    /// Reads a batch of `buffer.len()` values at `num_bits` each, preferring
    /// the generated group-of-8 unpack tables when byte-aligned, falling
    /// back to bit-by-bit reads otherwise. Returns the number of values
    /// actually read.
    pub fn get_batch_i32(&mut self, buffer: &mut [i32], num_bits: usize) -> usize {
        let mut i = 0;
        if self.bit_offset == 0 && num_bits > 0 {
            let group_bytes = ceil8(num_bits);
            while i + 8 <= buffer.len() && self.buffer.len() - self.byte_offset >= group_bytes {
                let slice = self.buffer.range(self.byte_offset, group_bytes);
                let out = unpack8_i32(num_bits, slice.as_ref());
                buffer[i..i + 8].copy_from_slice(&out);
                self.byte_offset += group_bytes;
                i += 8;
            }
        }
        while i < buffer.len() {
            match self.get_value_u64(num_bits) {
                Some(v) => {
                    buffer[i] = v as i32;
                    i += 1;
                }
                None => break,
            }
        }
        i
    }

    pub fn get_batch_i64(&mut self, buffer: &mut [i64], num_bits: usize) -> usize {
        let mut i = 0;
        if self.bit_offset == 0 && num_bits > 0 {
            let group_bytes = ceil8(num_bits);
            while i + 8 <= buffer.len() && self.buffer.len() - self.byte_offset >= group_bytes {
                let slice = self.buffer.range(self.byte_offset, group_bytes);
                let out = unpack8_i64(num_bits, slice.as_ref());
                buffer[i..i + 8].copy_from_slice(&out);
                self.byte_offset += group_bytes;
                i += 8;
            }
        }
        while i < buffer.len() {
            match self.get_value_u64(num_bits) {
                Some(v) => {
                    buffer[i] = v as i64;
                    i += 1;
                }
                None => break,
            }
        }
        i
    }

    /// Reads a byte-aligned little-endian integer of `num_bytes`. Advances
    /// to the next byte boundary first if mid-byte (callers only do this
    /// between varint/run header reads, which are themselves byte-aligned).
    pub fn get_aligned_u64(&mut self, num_bytes: usize) -> Option<u64> {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
        if self.byte_offset + num_bytes > self.buffer.len() {
            return None;
        }
        let v = read_le_int(self.buffer.range(self.byte_offset, num_bytes).as_ref(), num_bytes);
        self.byte_offset += num_bytes;
        Some(v)
    }

    /// Reads a byte-aligned raw slice of `num_bytes`, advancing to the next
    /// byte boundary first if mid-byte. Used by the hybrid codec to pull a
    /// bit-packed group's raw bytes before handing them to `unpack8_*`.
    pub fn get_aligned_bytes(&mut self, num_bytes: usize) -> Option<ByteBufferPtr> {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
        if self.byte_offset + num_bytes > self.buffer.len() {
            return None;
        }
        let out = self.buffer.range(self.byte_offset, num_bytes);
        self.byte_offset += num_bytes;
        Some(out)
    }

    /// Reads an unsigned LEB128 varint. Fails if the buffer is exhausted
    /// mid-varint or the value overflows 64 bits.
    pub fn get_vlq_int(&mut self) -> Option<i64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.get_aligned_u64(1)? as u8;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 64 {
                return None;
            }
        }
        Some(result as i64)
    }

    /// Reads a zig-zag encoded signed varint.
    pub fn get_zigzag_vlq_int(&mut self) -> Option<i64> {
        let u = self.get_vlq_int()? as u64;
        Some(((u >> 1) as i64) ^ -((u & 1) as i64))
    }
}

/// Bit-level write cursor, the counterpart of `BitReader`.
pub struct BitWriter {
    buffer: Vec<u8>,
    buffered_values: u64,
    bit_offset: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { buffer: Vec::new(), buffered_values: 0, bit_offset: 0 }
    }

    pub fn with_capacity(cap: usize) -> Self {
        BitWriter { buffer: Vec::with_capacity(cap), buffered_values: 0, bit_offset: 0 }
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len() + if self.bit_offset > 0 { 1 } else { 0 }
    }

    /// Writes the low `num_bits` bits of `v`.
    pub fn put_value_u64(&mut self, v: u64, num_bits: usize) {
        if num_bits == 0 {
            return;
        }
        let mask = if num_bits == 64 { u64::MAX } else { (1u64 << num_bits) - 1 };
        self.buffered_values |= (v & mask) << self.bit_offset;
        self.bit_offset += num_bits;
        while self.bit_offset >= 8 {
            self.buffer.push((self.buffered_values & 0xFF) as u8);
            self.buffered_values >>= 8;
            self.bit_offset -= 8;
        }
    }

    /// Flushes any partially-filled trailing byte, zero-padded.
    pub fn flush(&mut self) {
        if self.bit_offset > 0 {
            self.buffer.push((self.buffered_values & 0xFF) as u8);
            self.buffered_values = 0;
            self.bit_offset = 0;
        }
    }

    /// Writes a group of eight values via the generated pack tables,
    /// requires the writer to currently be byte-aligned.
    pub fn put_batch_i32(&mut self, values: &[i32], num_bits: usize) {
        assert_eq!(self.bit_offset, 0, "put_batch requires byte alignment");
        let mut i = 0;
        while i + 8 <= values.len() {
            let mut group = [0i32; 8];
            group.copy_from_slice(&values[i..i + 8]);
            self.buffer.extend_from_slice(&pack8_i32(num_bits, &group));
            i += 8;
        }
        while i < values.len() {
            self.put_value_u64(values[i] as u32 as u64, num_bits);
            i += 1;
        }
        self.flush();
    }

    pub fn put_aligned_u64(&mut self, v: u64, num_bytes: usize) {
        self.flush();
        self.buffer.extend_from_slice(&write_le_int(v, num_bytes));
    }

    /// Appends raw bytes verbatim; requires the writer to currently be
    /// byte-aligned. Used by the delta-binary-packed encoder for already
    /// bit-packed miniblock data.
    pub fn put_aligned_bytes(&mut self, bytes: &[u8]) {
        self.flush();
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes an unsigned LEB128 varint.
    pub fn put_vlq_int(&mut self, v: u64) {
        let mut v = v;
        loop {
            let mut byte = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.put_aligned_u64(byte as u64, 1);
            if v == 0 {
                break;
            }
        }
    }

    /// Writes a zig-zag encoded signed varint.
    pub fn put_zigzag_vlq_int(&mut self, v: i64) {
        let zigzag = ((v << 1) ^ (v >> 63)) as u64;
        self.put_vlq_int(zigzag);
    }

    pub fn consume(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_pack_exactness_zero_width() {
        let input = [0i32; 8];
        let packed = pack8_i32(0, &input);
        assert_eq!(packed.len(), 0);
        let unpacked = unpack8_i32(0, &[]);
        assert_eq!(unpacked, [0; 8]);
    }

    #[test]
    fn test_bit_pack_roundtrip_all_widths_u32() {
        for w in 0..=32usize {
            let max = if w == 32 { u32::MAX } else { (1u64 << w) - 1 } as i32;
            let input = [max, 0, max, 0, max, 0, max, 0];
            let packed = pack8_i32(w, &input);
            assert_eq!(packed.len(), ceil8(w));
            let unpacked = unpack8_i32(w, &packed);
            assert_eq!(unpacked, input, "width {}", w);
        }
    }

    #[test]
    fn test_bit_pack_roundtrip_all_widths_u64() {
        for w in 0..=64usize {
            let max: i64 = if w == 64 { -1i64 } else { ((1u64 << w) - 1) as i64 };
            let input = [max, 0, max, 0, max, 0, max, 0];
            let packed = pack8_i64(w, &input);
            assert_eq!(packed.len(), ceil8(w));
            let unpacked = unpack8_i64(w, &packed);
            assert_eq!(unpacked, input, "width {}", w);
        }
    }

    #[test]
    fn test_varint_roundtrip() {
        let mut writer = BitWriter::new();
        let values: Vec<u64> = vec![0, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX];
        for &v in &values {
            writer.put_vlq_int(v);
        }
        let bytes = writer.consume();
        let mut reader = BitReader::from(bytes);
        for &v in &values {
            assert_eq!(reader.get_vlq_int().unwrap() as u64, v);
        }
    }

    #[test]
    fn test_zigzag_varint_roundtrip() {
        let mut writer = BitWriter::new();
        let values: Vec<i64> = vec![0, -1, 1, -128, 128, i32::MIN as i64, i32::MAX as i64];
        for &v in &values {
            writer.put_zigzag_vlq_int(v);
        }
        let bytes = writer.consume();
        let mut reader = BitReader::from(bytes);
        for &v in &values {
            assert_eq!(reader.get_zigzag_vlq_int().unwrap(), v);
        }
    }

    #[test]
    fn test_num_required_bits() {
        assert_eq!(num_required_bits(0), 0);
        assert_eq!(num_required_bits(1), 1);
        assert_eq!(num_required_bits(2), 2);
        assert_eq!(num_required_bits(7), 3);
        assert_eq!(num_required_bits(8), 4);
    }
}
