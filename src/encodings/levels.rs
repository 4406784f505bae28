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

//! Repetition/definition level storage. Levels are hybrid-coded
//! at a bit width derived from the column's maxR/maxD via
//! `num_required_bits`. A column with maxR = 0 (or maxD = 0) never needs to
//! store repetition (or definition) levels at all — every value implicitly
//! has level 0 (or maxD), so the "decoder" is just a constant stream.

use crate::errors::Result;
use crate::encodings::rle::{RleDecoder, RleEncoder};
use crate::util::bit_util::num_required_bits;
use crate::util::memory::ByteBufferPtr;

/// Buffers levels and hybrid-encodes them at `flush()`. Construct with
/// `max_level == 0` for a column that doesn't need this level at all — in
/// that case `put`/`flush` are no-ops and `bit_width()` is 0.
pub struct LevelEncoder {
    bit_width: usize,
    encoder: Option<RleEncoder>,
    count: usize,
}

impl LevelEncoder {
    pub fn new(max_level: i16) -> Self {
        let bit_width = num_required_bits(max_level as u64);
        let encoder = if bit_width > 0 { Some(RleEncoder::new(bit_width)) } else { None };
        LevelEncoder { bit_width, encoder, count: 0 }
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    pub fn put(&mut self, level: i16) {
        self.count += 1;
        if let Some(e) = self.encoder.as_mut() {
            e.put(level as u64);
        }
    }

    pub fn put_batch(&mut self, levels: &[i16]) {
        self.count += levels.len();
        if let Some(e) = self.encoder.as_mut() {
            for &l in levels {
                e.put(l as u64);
            }
        }
    }

    /// Returns the hybrid-coded bytes, or an empty vector for a degenerate
    /// (max_level == 0) column.
    pub fn flush_buffer(&mut self) -> Vec<u8> {
        self.count = 0;
        match self.encoder.as_mut() {
            Some(e) => e.flush_buffer(),
            None => Vec::new(),
        }
    }
}

enum LevelSource {
    Constant(i16),
    Hybrid(RleDecoder),
}

/// Dispenses levels for one page: a constant stream for a degenerate column,
/// otherwise a hybrid-coded stream bound to `set_data`.
pub struct LevelDecoder {
    max_level: i16,
    bit_width: usize,
    source: LevelSource,
}

impl LevelDecoder {
    pub fn new(max_level: i16) -> Self {
        let bit_width = num_required_bits(max_level as u64);
        let source = if bit_width == 0 {
            LevelSource::Constant(0)
        } else {
            LevelSource::Hybrid(RleDecoder::new(bit_width as u8))
        };
        LevelDecoder { max_level, bit_width, source }
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    /// Binds the decoder to a length-prefixed hybrid stream (the
    /// "init-with-size" variant — data page v1 framing for levels). Returns
    /// the number of bytes consumed, or 0 for a degenerate column.
    pub fn set_data_with_length_prefix(&mut self, data: ByteBufferPtr) -> Result<usize> {
        match &mut self.source {
            LevelSource::Constant(_) => Ok(0),
            LevelSource::Hybrid(d) => d.set_data_with_length_prefix(data),
        }
    }

    /// Binds the decoder to a stream whose length is already known from the
    /// surrounding container (data page v2's `repetition_levels_byte_length`).
    pub fn set_data(&mut self, data: ByteBufferPtr) {
        if let LevelSource::Hybrid(d) = &mut self.source {
            d.set_data(data);
        }
    }

    pub fn get_batch(&mut self, buffer: &mut [i16]) -> Result<usize> {
        match &mut self.source {
            LevelSource::Constant(_) => {
                for slot in buffer.iter_mut() {
                    *slot = self.max_level;
                }
                Ok(buffer.len())
            }
            LevelSource::Hybrid(d) => d.get_batch(buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_level_decoder_is_constant() {
        let mut decoder = LevelDecoder::new(0);
        assert_eq!(decoder.bit_width(), 0);
        let mut buf = [1i16; 5];
        let n = decoder.get_batch(&mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf, [0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_level_roundtrip_optional_primitive() {
        // maxD = 1: values present (d=1) or null (d=0), maxR = 0.
        let defs = [1i16, 1, 0, 1, 0, 0, 1];
        let mut encoder = LevelEncoder::new(1);
        assert_eq!(encoder.bit_width(), 1);
        encoder.put_batch(&defs);
        let bytes = encoder.flush_buffer();

        let mut decoder = LevelDecoder::new(1);
        let mut framed = Vec::new();
        framed.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        framed.extend_from_slice(&bytes);
        decoder.set_data_with_length_prefix(ByteBufferPtr::new(framed)).unwrap();

        let mut out = [0i16; 7];
        let n = decoder.get_batch(&mut out).unwrap();
        assert_eq!(n, 7);
        assert_eq!(out, defs);
    }
}
