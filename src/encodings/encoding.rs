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

//! Write-side codecs: plain, dictionary, RLE, and the three delta codecs.
//! Each encoder is generic over a `DataType`, dispatching through `T::T`'s
//! `ParquetValueType` methods rather than via specialization.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::basic::Encoding;
use crate::column::dict::ColumnDictionary;
use crate::data_type::DataType;
use crate::encodings::delta_bit_packed::DeltaBitPackEncoder;
use crate::encodings::rle::RleEncoder;
use crate::errors::Result;
use crate::util::bit_util::num_required_bits;

pub trait Encoder<T: DataType> {
    fn put(&mut self, values: &[T::T]) -> Result<()>;
    fn encoding(&self) -> Encoding;
    /// Rough size, in bytes, of what `flush_buffer` would currently produce;
    /// used by the column writer to decide when to close a page.
    fn estimated_data_encoded_size(&self) -> usize;
    fn flush_buffer(&mut self) -> Result<Vec<u8>>;
}

/// Verbatim plain encoding: delegates entirely to `T::T::write_plain`.
pub struct PlainEncoder<T: DataType> {
    buffer: Vec<T::T>,
    type_length: Option<usize>,
}

impl<T: DataType> PlainEncoder<T> {
    pub fn new(type_length: Option<usize>) -> Self {
        PlainEncoder { buffer: Vec::new(), type_length }
    }
}

impl<T: DataType> Encoder<T> for PlainEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        self.buffer.extend_from_slice(values);
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::PLAIN
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.buffer.iter().map(|v| v.value_size().max(1)).sum()
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        let mut sink = Vec::new();
        T::T::write_plain(&self.buffer, self.type_length, &mut sink);
        self.buffer.clear();
        Ok(sink)
    }
}

/// Dictionary-encoded values: interns each value into a `ColumnDictionary`,
/// then hybrid-RLE-codes the resulting indices with a one-byte bit-width
/// header (no length prefix — the page layer frames the whole payload).
/// Falls back with an error once the dictionary exceeds its size limit; the
/// column writer is responsible for catching that and switching the column
/// to `PlainEncoder`.
pub struct DictEncoder<T: DataType> {
    dict: ColumnDictionary<T>,
    indices: Vec<u32>,
}

impl<T: DataType> DictEncoder<T> {
    pub fn new(size_limit: usize) -> Self {
        DictEncoder { dict: ColumnDictionary::new(size_limit), indices: Vec::new() }
    }

    pub fn dictionary(&self) -> &ColumnDictionary<T> {
        &self.dict
    }

    /// The dictionary page's plain-encoded payload.
    pub fn write_dictionary_page(&self, type_length: Option<usize>) -> Vec<u8> {
        let mut sink = Vec::new();
        T::T::write_plain(self.dict.values(), type_length, &mut sink);
        sink
    }

    pub fn num_entries(&self) -> usize {
        self.dict.num_entries()
    }
}

impl<T: DataType> Encoder<T> for DictEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        for v in values {
            match self.dict.get_or_insert(v) {
                Some(idx) => self.indices.push(idx),
                None => {
                    return Err(general_err!(
                        "Dictionary exceeded its size limit; caller must fall back to plain encoding"
                    ))
                }
            }
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::RLE_DICTIONARY
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.indices.len() * 4
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        let max_index = self.dict.num_entries().saturating_sub(1) as u64;
        let bit_width = std::cmp::max(1, num_required_bits(max_index));
        let mut encoder = RleEncoder::new(bit_width);
        for &idx in &self.indices {
            encoder.put(idx as u64);
        }
        let mut sink = vec![bit_width as u8];
        sink.extend(encoder.flush_buffer());
        self.indices.clear();
        Ok(sink)
    }
}

/// The `RLE` physical encoding, applicable only to `bool` columns at bit
/// width 1, framed with a 4-byte little-endian length prefix (mirroring the
/// def/rep level framing).
pub struct RleValueEncoder<T: DataType> {
    encoder: RleEncoder,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> RleValueEncoder<T> {
    pub fn new() -> Result<Self> {
        if !T::T::supports_rle_value_encoding() {
            return Err(nyi_err!("RLE value encoding only supports boolean columns"));
        }
        Ok(RleValueEncoder { encoder: RleEncoder::new(1), _marker: std::marker::PhantomData })
    }
}

impl<T: DataType> Encoder<T> for RleValueEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        for v in values {
            let as_bytes = v.to_stat_bytes();
            let bit = as_bytes.first().copied().unwrap_or(0) as u64;
            self.encoder.put(bit);
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::RLE
    }

    fn estimated_data_encoded_size(&self) -> usize {
        0
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        let payload = self.encoder.flush_buffer();
        let mut sink = Vec::with_capacity(4 + payload.len());
        sink.write_u32::<LittleEndian>(payload.len() as u32).expect("Vec<u8> writes never fail");
        sink.extend_from_slice(&payload);
        Ok(sink)
    }
}

/// `DELTA_BINARY_PACKED`, applicable to INT32/INT64 columns.
pub struct DeltaBinaryPackedEncoder<T: DataType> {
    inner: DeltaBitPackEncoder,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaBinaryPackedEncoder<T> {
    pub fn new() -> Self {
        DeltaBinaryPackedEncoder { inner: DeltaBitPackEncoder::new(), _marker: std::marker::PhantomData }
    }
}

impl<T: DataType> Default for DeltaBinaryPackedEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Encoder<T> for DeltaBinaryPackedEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        for v in values {
            let i = v
                .as_delta_i64()
                .ok_or_else(|| nyi_err!("DELTA_BINARY_PACKED only supports INT32/INT64"))?;
            self.inner.put(i);
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_BINARY_PACKED
    }

    fn estimated_data_encoded_size(&self) -> usize {
        0
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.inner.flush_buffer())
    }
}

/// `DELTA_LENGTH_BYTE_ARRAY`: lengths delta-binary-packed, followed by the
/// concatenated raw bytes.
pub struct DeltaLengthByteArrayEncoder<T: DataType> {
    lengths: DeltaBitPackEncoder,
    data: Vec<u8>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaLengthByteArrayEncoder<T> {
    pub fn new() -> Self {
        DeltaLengthByteArrayEncoder {
            lengths: DeltaBitPackEncoder::new(),
            data: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: DataType> Default for DeltaLengthByteArrayEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Encoder<T> for DeltaLengthByteArrayEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        for v in values {
            let bytes = v
                .as_byte_slice()
                .ok_or_else(|| nyi_err!("DELTA_LENGTH_BYTE_ARRAY only supports byte array types"))?;
            self.lengths.put(bytes.len() as i64);
            self.data.extend_from_slice(bytes);
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_LENGTH_BYTE_ARRAY
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.data.len()
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        let mut sink = self.lengths.flush_buffer();
        sink.extend_from_slice(&self.data);
        self.data.clear();
        Ok(sink)
    }
}

/// `DELTA_BYTE_ARRAY`: each value is split into a shared prefix (length with
/// the previous value, delta-binary-packed) and a suffix (length
/// delta-binary-packed, bytes concatenated).
pub struct DeltaByteArrayEncoder<T: DataType> {
    prefix_lengths: DeltaBitPackEncoder,
    suffix_lengths: DeltaBitPackEncoder,
    suffix_data: Vec<u8>,
    previous: Vec<u8>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaByteArrayEncoder<T> {
    pub fn new() -> Self {
        DeltaByteArrayEncoder {
            prefix_lengths: DeltaBitPackEncoder::new(),
            suffix_lengths: DeltaBitPackEncoder::new(),
            suffix_data: Vec::new(),
            previous: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: DataType> Default for DeltaByteArrayEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Encoder<T> for DeltaByteArrayEncoder<T> {
    fn put(&mut self, values: &[T::T]) -> Result<()> {
        for v in values {
            let bytes = v
                .as_byte_slice()
                .ok_or_else(|| nyi_err!("DELTA_BYTE_ARRAY only supports byte array types"))?;
            let max_prefix = std::cmp::min(bytes.len(), self.previous.len());
            let mut prefix_len = 0;
            while prefix_len < max_prefix && bytes[prefix_len] == self.previous[prefix_len] {
                prefix_len += 1;
            }
            self.prefix_lengths.put(prefix_len as i64);
            self.suffix_lengths.put((bytes.len() - prefix_len) as i64);
            self.suffix_data.extend_from_slice(&bytes[prefix_len..]);
            self.previous = bytes.to_vec();
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_BYTE_ARRAY
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.suffix_data.len()
    }

    fn flush_buffer(&mut self) -> Result<Vec<u8>> {
        let mut sink = self.prefix_lengths.flush_buffer();
        sink.extend(self.suffix_lengths.flush_buffer());
        sink.extend_from_slice(&self.suffix_data);
        self.suffix_data.clear();
        self.previous.clear();
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{ByteArray, Int32Type};

    #[test]
    fn test_plain_encoder_int32() {
        let mut enc: PlainEncoder<Int32Type> = PlainEncoder::new(None);
        enc.put(&[1, 2, 3]).unwrap();
        let bytes = enc.flush_buffer().unwrap();
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_dict_encoder_dedup() {
        let mut enc: DictEncoder<Int32Type> = DictEncoder::new(1024);
        enc.put(&[5, 6, 5, 7, 6]).unwrap();
        assert_eq!(enc.num_entries(), 3);
        let bytes = enc.flush_buffer().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_delta_length_byte_array_encoder() {
        use crate::data_type::ByteArrayType;
        let mut enc: DeltaLengthByteArrayEncoder<ByteArrayType> = DeltaLengthByteArrayEncoder::new();
        enc.put(&[ByteArray::from("a"), ByteArray::from("bb"), ByteArray::from("ccc")]).unwrap();
        let bytes = enc.flush_buffer().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_delta_byte_array_encoder_shares_prefix() {
        use crate::data_type::ByteArrayType;
        let mut enc: DeltaByteArrayEncoder<ByteArrayType> = DeltaByteArrayEncoder::new();
        enc.put(&[ByteArray::from("hello"), ByteArray::from("help"), ByteArray::from("world")])
            .unwrap();
        let bytes = enc.flush_buffer().unwrap();
        assert!(!bytes.is_empty());
    }
}
