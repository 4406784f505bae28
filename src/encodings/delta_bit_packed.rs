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

//! The delta-binary-packed codec. A stream opens
//! with a header of four zig-zag/plain varints (block size, miniblocks per
//! block, total value count, first value), then a sequence of blocks. Each
//! block carries a zig-zag `min_delta`, one bit-width byte per miniblock,
//! and the miniblocks themselves — each a run of `pack8` groups at that
//! miniblock's width, holding `delta - min_delta`.
//!
//! `BLOCK_SIZE` and `MINIBLOCKS_PER_BLOCK` are encoder choices, not part of
//! the wire contract; 128 values over 4 miniblocks (32 values, 4 groups of
//! eight, per miniblock) matches what the format's reference encoders use.

use crate::errors::Result;
use crate::util::bit_util::{num_required_bits, pack8_i64, unpack8_i64, BitReader, BitWriter};
use crate::util::memory::ByteBufferPtr;

const BLOCK_SIZE: usize = 128;
const MINIBLOCKS_PER_BLOCK: usize = 4;
const VALUES_PER_MINIBLOCK: usize = BLOCK_SIZE / MINIBLOCKS_PER_BLOCK;

pub struct DeltaBitPackEncoder {
    values: Vec<i64>,
}

impl DeltaBitPackEncoder {
    pub fn new() -> Self {
        DeltaBitPackEncoder { values: Vec::new() }
    }

    pub fn put(&mut self, v: i64) {
        self.values.push(v);
    }

    pub fn put_batch(&mut self, values: &[i64]) {
        self.values.extend_from_slice(values);
    }

    pub fn flush_buffer(&mut self) -> Vec<u8> {
        let values = std::mem::take(&mut self.values);
        encode(&values)
    }
}

impl Default for DeltaBitPackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(values: &[i64]) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.put_vlq_int(BLOCK_SIZE as u64);
    writer.put_vlq_int(MINIBLOCKS_PER_BLOCK as u64);
    writer.put_vlq_int(values.len() as u64);
    let first_value = values.first().copied().unwrap_or(0);
    writer.put_zigzag_vlq_int(first_value);

    if values.len() <= 1 {
        return writer.consume();
    }

    let deltas: Vec<i64> = values.windows(2).map(|w| w[1].wrapping_sub(w[0])).collect();

    let mut i = 0;
    while i < deltas.len() {
        let end = std::cmp::min(i + BLOCK_SIZE, deltas.len());
        let block = &deltas[i..end];
        i = end;

        let min_delta = block.iter().copied().min().unwrap();
        writer.put_zigzag_vlq_int(min_delta);

        let mut bit_widths = [0u8; MINIBLOCKS_PER_BLOCK];
        let mut chunks: Vec<Vec<u64>> = Vec::with_capacity(MINIBLOCKS_PER_BLOCK);
        for m in 0..MINIBLOCKS_PER_BLOCK {
            let start = m * VALUES_PER_MINIBLOCK;
            if start >= block.len() {
                chunks.push(Vec::new());
                continue;
            }
            let stop = std::cmp::min(start + VALUES_PER_MINIBLOCK, block.len());
            let chunk: Vec<u64> =
                block[start..stop].iter().map(|d| d.wrapping_sub(min_delta) as u64).collect();
            let width = num_required_bits(chunk.iter().copied().max().unwrap_or(0));
            bit_widths[m] = width as u8;
            chunks.push(chunk);
        }

        for &w in &bit_widths {
            writer.put_aligned_u64(w as u64, 1);
        }
        for (m, chunk) in chunks.iter().enumerate() {
            let width = bit_widths[m] as usize;
            if width == 0 {
                continue;
            }
            let mut padded = chunk.clone();
            padded.resize(VALUES_PER_MINIBLOCK, 0);
            for g in (0..VALUES_PER_MINIBLOCK).step_by(8) {
                let mut group = [0i64; 8];
                for k in 0..8 {
                    group[k] = padded[g + k] as i64;
                }
                writer.put_aligned_bytes(&pack8_i64(width, &group));
            }
        }
    }
    writer.consume()
}

pub struct DeltaBitPackDecoder {
    values: Vec<i64>,
    pos: usize,
}

impl DeltaBitPackDecoder {
    pub fn new() -> Self {
        DeltaBitPackDecoder { values: Vec::new(), pos: 0 }
    }

    pub fn set_data(&mut self, data: ByteBufferPtr) -> Result<()> {
        let mut reader = BitReader::new(data);
        self.values = decode(&mut reader)?;
        self.pos = 0;
        Ok(())
    }

    pub fn values_left(&self) -> usize {
        self.values.len() - self.pos
    }

    pub fn get_batch(&mut self, buffer: &mut [i64]) -> Result<usize> {
        let n = std::cmp::min(buffer.len(), self.values_left());
        buffer[..n].copy_from_slice(&self.values[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Default for DeltaBitPackDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(reader: &mut BitReader) -> Result<Vec<i64>> {
    let block_size = reader
        .get_vlq_int()
        .ok_or_else(|| eof_err!("Truncated delta-binary-packed header: block size"))?
        as usize;
    let miniblocks_per_block = reader
        .get_vlq_int()
        .ok_or_else(|| eof_err!("Truncated delta-binary-packed header: miniblock count"))?
        as usize;
    let total_count = reader
        .get_vlq_int()
        .ok_or_else(|| eof_err!("Truncated delta-binary-packed header: value count"))?
        as usize;
    let first_value = reader
        .get_zigzag_vlq_int()
        .ok_or_else(|| eof_err!("Truncated delta-binary-packed header: first value"))?;

    let mut values = Vec::with_capacity(total_count);
    if total_count == 0 {
        return Ok(values);
    }
    values.push(first_value);
    if total_count == 1 {
        return Ok(values);
    }
    if miniblocks_per_block == 0 || block_size % miniblocks_per_block != 0 {
        return Err(general_err!(
            "Malformed delta-binary-packed stream: block_size {} not divisible by miniblock count {}",
            block_size,
            miniblocks_per_block
        ));
    }
    let values_per_miniblock = block_size / miniblocks_per_block;
    if values_per_miniblock % 8 != 0 {
        return Err(general_err!(
            "Malformed delta-binary-packed stream: miniblock size {} not a multiple of 8",
            values_per_miniblock
        ));
    }

    let mut prev = first_value;
    let mut remaining = total_count - 1;
    while remaining > 0 {
        let min_delta = reader
            .get_zigzag_vlq_int()
            .ok_or_else(|| eof_err!("Truncated delta-binary-packed block: min_delta"))?;
        let mut bit_widths = vec![0u8; miniblocks_per_block];
        for w in bit_widths.iter_mut() {
            let raw = reader
                .get_aligned_u64(1)
                .ok_or_else(|| eof_err!("Truncated delta-binary-packed block: bit widths"))?;
            if raw > 64 {
                return Err(general_err!("Malformed delta-binary-packed stream: bit width {} exceeds 64", raw));
            }
            *w = raw as u8;
        }
        for &width in &bit_widths {
            let width = width as usize;
            let group_values: Vec<u64> = if width == 0 {
                vec![0; values_per_miniblock]
            } else {
                let nbytes = (width + 7) / 8;
                let mut out = Vec::with_capacity(values_per_miniblock);
                for _ in (0..values_per_miniblock).step_by(8) {
                    let bytes = reader.get_aligned_bytes(nbytes).ok_or_else(|| {
                        eof_err!("Truncated delta-binary-packed miniblock data")
                    })?;
                    let group = unpack8_i64(width, bytes.as_ref());
                    out.extend(group.iter().map(|&v| v as u64));
                }
                out
            };
            for &g in &group_values {
                if remaining == 0 {
                    break;
                }
                let delta = min_delta.wrapping_add(g as i64);
                let value = prev.wrapping_add(delta);
                values.push(value);
                prev = value;
                remaining -= 1;
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(values: &[i64]) -> Vec<i64> {
        let mut encoder = DeltaBitPackEncoder::new();
        encoder.put_batch(values);
        let bytes = encoder.flush_buffer();
        let mut decoder = DeltaBitPackDecoder::new();
        decoder.set_data(ByteBufferPtr::new(bytes)).unwrap();
        let mut out = vec![0i64; values.len()];
        let n = decoder.get_batch(&mut out).unwrap();
        assert_eq!(n, values.len());
        out
    }

    #[test]
    fn test_delta_bit_packed_small() {
        let values: Vec<i64> = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(roundtrip(&values), values);
    }

    #[test]
    fn test_delta_bit_packed_single_value() {
        assert_eq!(roundtrip(&[42]), vec![42]);
    }

    #[test]
    fn test_delta_bit_packed_empty() {
        let empty: Vec<i64> = Vec::new();
        assert_eq!(roundtrip(&empty), empty);
    }

    #[test]
    fn test_delta_bit_packed_constant_deltas() {
        let values: Vec<i64> = (0..300).map(|i| i * 3).collect();
        assert_eq!(roundtrip(&values), values);
    }

    #[test]
    fn test_delta_bit_packed_negative_and_mixed() {
        let values: Vec<i64> = vec![100, 97, 150, -20, -20, -19, 500, 500, 500, 0];
        assert_eq!(roundtrip(&values), values);
    }

    #[test]
    fn test_delta_bit_packed_spans_multiple_blocks() {
        let values: Vec<i64> = (0..1000).map(|i| (i * i) % 997).collect();
        assert_eq!(roundtrip(&values), values);
    }

    #[test]
    fn test_delta_bit_packed_exact_header_fields() {
        let values: Vec<i64> = vec![7, 9, 12];
        let mut encoder = DeltaBitPackEncoder::new();
        encoder.put_batch(&values);
        let bytes = encoder.flush_buffer();
        let mut reader = BitReader::new(ByteBufferPtr::new(bytes));
        assert_eq!(reader.get_vlq_int().unwrap(), BLOCK_SIZE as i64);
        assert_eq!(reader.get_vlq_int().unwrap(), MINIBLOCKS_PER_BLOCK as i64);
        assert_eq!(reader.get_vlq_int().unwrap(), 3);
        assert_eq!(reader.get_zigzag_vlq_int().unwrap(), 7);
    }
}
