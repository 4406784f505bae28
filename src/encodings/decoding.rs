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

//! Read-side codecs, the mirror image of `encodings::encoding`. Dispatch is
//! generic over `T: DataType`, routed through `T::T`'s `ParquetValueType`
//! methods — no specialization needed, unlike a `transmute`-based approach.

use crate::basic::Encoding;
use crate::data_type::DataType;
use crate::encodings::delta_bit_packed::DeltaBitPackDecoder;
use crate::encodings::rle::RleDecoder;
use crate::errors::Result;
use crate::util::bit_util::BitReader;
use crate::util::memory::ByteBufferPtr;

pub trait Decoder<T: DataType> {
    /// Binds the decoder to a fresh page's value stream.
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()>;

    /// Decodes up to `buffer.len()` values, returning the count actually
    /// produced (less than requested only at the end of the page's values).
    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize>;

    fn values_left(&self) -> usize;

    fn encoding(&self) -> Encoding;
}

/// Constructs the decoder matching `encoding`. Dictionary-encoded pages need
/// `dictionary` (the already materialized values of the preceding
/// dictionary page); the chunk reader is responsible for sequencing a
/// DICTIONARY_PAGE ahead of any page that needs one.
pub fn get_decoder<T: DataType>(
    encoding: Encoding,
    type_length: Option<usize>,
    dictionary: Option<&[T::T]>,
) -> Result<Box<dyn Decoder<T>>> {
    match encoding {
        Encoding::PLAIN => Ok(Box::new(PlainDecoder::<T>::new(type_length))),
        Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY => match dictionary {
            Some(dict) => Ok(Box::new(DictDecoder::<T>::new(dict.to_vec()))),
            None => Err(general_err!("Dictionary-encoded page with no preceding dictionary page")),
        },
        Encoding::RLE => {
            if !T::T::supports_rle_value_encoding() {
                return Err(nyi_err!("RLE value encoding only supports boolean columns"));
            }
            Ok(Box::new(RleValueDecoder::<T>::new()))
        }
        Encoding::DELTA_BINARY_PACKED => Ok(Box::new(DeltaBinaryPackedDecoder::<T>::new())),
        Encoding::DELTA_LENGTH_BYTE_ARRAY => Ok(Box::new(DeltaLengthByteArrayDecoder::<T>::new())),
        Encoding::DELTA_BYTE_ARRAY => Ok(Box::new(DeltaByteArrayDecoder::<T>::new())),
        Encoding::BIT_PACKED => Err(nyi_err!("BIT_PACKED is a legacy encoding, not supported")),
    }
}

pub struct PlainDecoder<T: DataType> {
    data: Option<ByteBufferPtr>,
    offset: usize,
    num_values: usize,
    type_length: Option<usize>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> PlainDecoder<T> {
    pub fn new(type_length: Option<usize>) -> Self {
        PlainDecoder { data: None, offset: 0, num_values: 0, type_length, _marker: std::marker::PhantomData }
    }
}

impl<T: DataType> Decoder<T> for PlainDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        self.data = Some(data);
        self.offset = 0;
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let data = self.data.as_ref().ok_or_else(|| general_err!("set_data not called"))?;
        let n = std::cmp::min(buffer.len(), self.num_values);
        let (values, consumed) = T::T::read_plain(data, self.offset, n, self.type_length)?;
        self.offset += consumed;
        self.num_values -= n;
        buffer[..n].clone_from_slice(&values);
        Ok(n)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::PLAIN
    }
}

/// Decodes dictionary indices (hybrid-coded with a leading bit-width byte,
/// no length prefix) and maps them through an already materialized
/// dictionary.
pub struct DictDecoder<T: DataType> {
    dictionary: Vec<T::T>,
    rle: Option<RleDecoder>,
    num_values: usize,
}

impl<T: DataType> DictDecoder<T> {
    pub fn new(dictionary: Vec<T::T>) -> Self {
        DictDecoder { dictionary, rle: None, num_values: 0 }
    }
}

impl<T: DataType> Decoder<T> for DictDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        if data.is_empty() {
            return Err(eof_err!("Empty dictionary-indices page"));
        }
        let bit_width = data[0];
        let mut rle = RleDecoder::new(bit_width);
        rle.set_data(data.start_from(1));
        self.rle = Some(rle);
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let rle = self.rle.as_mut().ok_or_else(|| general_err!("set_data not called"))?;
        let n = std::cmp::min(buffer.len(), self.num_values);
        let read = rle.get_batch_with_dict(&self.dictionary, buffer, n)?;
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::RLE_DICTIONARY
    }
}

/// The `RLE` physical encoding, boolean columns only; framed with a 4-byte
/// little-endian length prefix.
pub struct RleValueDecoder<T: DataType> {
    rle: RleDecoder,
    num_values: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> RleValueDecoder<T> {
    pub fn new() -> Self {
        RleValueDecoder { rle: RleDecoder::new(1), num_values: 0, _marker: std::marker::PhantomData }
    }
}

impl<T: DataType> Default for RleValueDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Decoder<T> for RleValueDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        self.rle.set_data_with_length_prefix(data)?;
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let n = std::cmp::min(buffer.len(), self.num_values);
        let mut bits = vec![false; n];
        let read = self.rle.get_batch(&mut bits)?;
        for i in 0..read {
            buffer[i] = T::T::from_bool(bits[i])
                .ok_or_else(|| general_err!("RLE value encoding only supports boolean columns"))?;
        }
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::RLE
    }
}

pub struct DeltaBinaryPackedDecoder<T: DataType> {
    inner: DeltaBitPackDecoder,
    num_values: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaBinaryPackedDecoder<T> {
    pub fn new() -> Self {
        DeltaBinaryPackedDecoder { inner: DeltaBitPackDecoder::new(), num_values: 0, _marker: std::marker::PhantomData }
    }
}

impl<T: DataType> Default for DeltaBinaryPackedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Decoder<T> for DeltaBinaryPackedDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        self.inner.set_data(data)?;
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let n = std::cmp::min(buffer.len(), self.num_values);
        let mut raw = vec![0i64; n];
        let read = self.inner.get_batch(&mut raw)?;
        for i in 0..read {
            buffer[i] = T::T::from_delta_i64(raw[i])
                .ok_or_else(|| nyi_err!("DELTA_BINARY_PACKED only supports INT32/INT64"))?;
        }
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_BINARY_PACKED
    }
}

/// Replays a delta-binary-packed stream's header + block framing, without
/// materializing values, far enough to learn how many bytes it occupies.
/// Used to locate the byte payload that follows a length stream in
/// `DELTA_LENGTH_BYTE_ARRAY`/`DELTA_BYTE_ARRAY`.
fn delta_stream_byte_len(data: &ByteBufferPtr) -> Result<usize> {
    let mut r = BitReader::new(data.clone());
    let block_size = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated delta header"))? as usize;
    let miniblocks_per_block =
        r.get_vlq_int().ok_or_else(|| eof_err!("Truncated delta header"))? as usize;
    let total_count = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated delta header"))? as usize;
    let _first = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated delta header"))?;
    if total_count <= 1 {
        return Ok(r.get_byte_offset());
    }
    let values_per_miniblock = block_size / miniblocks_per_block;
    let mut remaining = total_count - 1;
    while remaining > 0 {
        let _min_delta = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated delta block"))?;
        let mut widths = vec![0u8; miniblocks_per_block];
        for w in widths.iter_mut() {
            let raw = r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated delta block"))?;
            if raw > 64 {
                return Err(general_err!("Malformed delta-binary-packed stream: bit width {} exceeds 64", raw));
            }
            *w = raw as u8;
        }
        for &width in &widths {
            let width = width as usize;
            if width > 0 {
                let nbytes = (width + 7) / 8;
                for _ in (0..values_per_miniblock).step_by(8) {
                    r.get_aligned_bytes(nbytes).ok_or_else(|| eof_err!("Truncated delta miniblock"))?;
                }
            }
            remaining = remaining.saturating_sub(values_per_miniblock);
        }
    }
    Ok(r.get_byte_offset())
}

pub struct DeltaLengthByteArrayDecoder<T: DataType> {
    lengths: DeltaBitPackDecoder,
    data: Option<ByteBufferPtr>,
    offset: usize,
    num_values: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaLengthByteArrayDecoder<T> {
    pub fn new() -> Self {
        DeltaLengthByteArrayDecoder {
            lengths: DeltaBitPackDecoder::new(),
            data: None,
            offset: 0,
            num_values: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: DataType> Default for DeltaLengthByteArrayDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Decoder<T> for DeltaLengthByteArrayDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        let header_len = delta_stream_byte_len(&data)?;
        self.lengths.set_data(data.clone())?;
        self.data = Some(data.start_from(header_len));
        self.offset = 0;
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let n = std::cmp::min(buffer.len(), self.num_values);
        let mut lens = vec![0i64; n];
        let read = self.lengths.get_batch(&mut lens)?;
        let data = self.data.as_ref().ok_or_else(|| general_err!("set_data not called"))?;
        for i in 0..read {
            let len = lens[i] as usize;
            if self.offset + len > data.len() {
                return Err(eof_err!("Truncated DELTA_LENGTH_BYTE_ARRAY payload"));
            }
            let bytes = data.range(self.offset, len);
            self.offset += len;
            buffer[i] = T::T::from_owned_bytes(bytes)
                .ok_or_else(|| nyi_err!("DELTA_LENGTH_BYTE_ARRAY only supports byte array types"))?;
        }
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_LENGTH_BYTE_ARRAY
    }
}

pub struct DeltaByteArrayDecoder<T: DataType> {
    prefix_lengths: DeltaBitPackDecoder,
    suffix_lengths: DeltaBitPackDecoder,
    data: Option<ByteBufferPtr>,
    offset: usize,
    previous: Vec<u8>,
    num_values: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> DeltaByteArrayDecoder<T> {
    pub fn new() -> Self {
        DeltaByteArrayDecoder {
            prefix_lengths: DeltaBitPackDecoder::new(),
            suffix_lengths: DeltaBitPackDecoder::new(),
            data: None,
            offset: 0,
            previous: Vec::new(),
            num_values: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: DataType> Default for DeltaByteArrayDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataType> Decoder<T> for DeltaByteArrayDecoder<T> {
    fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        let prefix_len = delta_stream_byte_len(&data)?;
        self.prefix_lengths.set_data(data.clone())?;
        let suffix_stream = data.start_from(prefix_len);
        let suffix_header_len = delta_stream_byte_len(&suffix_stream)?;
        self.suffix_lengths.set_data(suffix_stream.clone())?;
        self.data = Some(suffix_stream.start_from(suffix_header_len));
        self.offset = 0;
        self.previous.clear();
        self.num_values = num_values;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let n = std::cmp::min(buffer.len(), self.num_values);
        let mut prefix_lens = vec![0i64; n];
        let mut suffix_lens = vec![0i64; n];
        let read_p = self.prefix_lengths.get_batch(&mut prefix_lens)?;
        let read_s = self.suffix_lengths.get_batch(&mut suffix_lens)?;
        let read = std::cmp::min(read_p, read_s);
        let data = self.data.as_ref().ok_or_else(|| general_err!("set_data not called"))?;
        for i in 0..read {
            let prefix_len = prefix_lens[i] as usize;
            let suffix_len = suffix_lens[i] as usize;
            if prefix_len > self.previous.len() {
                return Err(general_err!("DELTA_BYTE_ARRAY prefix longer than previous value"));
            }
            if self.offset + suffix_len > data.len() {
                return Err(eof_err!("Truncated DELTA_BYTE_ARRAY suffix payload"));
            }
            let mut value = self.previous[..prefix_len].to_vec();
            value.extend_from_slice(data.range(self.offset, suffix_len).as_ref());
            self.offset += suffix_len;
            self.previous = value.clone();
            buffer[i] = T::T::from_owned_bytes(ByteBufferPtr::new(value))
                .ok_or_else(|| nyi_err!("DELTA_BYTE_ARRAY only supports byte array types"))?;
        }
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_BYTE_ARRAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{ByteArray, ByteArrayType, Int32Type};
    use crate::encodings::encoding::{
        DeltaByteArrayEncoder, DeltaLengthByteArrayEncoder, Encoder, PlainEncoder,
    };
    use crate::util::bit_util::num_required_bits;

    #[test]
    fn test_plain_decoder_roundtrip() {
        let mut enc: PlainEncoder<Int32Type> = PlainEncoder::new(None);
        enc.put(&[10, 20, 30]).unwrap();
        let bytes = enc.flush_buffer().unwrap();
        let mut dec: PlainDecoder<Int32Type> = PlainDecoder::new(None);
        dec.set_data(ByteBufferPtr::new(bytes), 3).unwrap();
        let mut out = [0i32; 3];
        assert_eq!(dec.get(&mut out).unwrap(), 3);
        assert_eq!(out, [10, 20, 30]);
    }

    #[test]
    fn test_dict_decoder_roundtrip() {
        let dictionary = vec![ByteArray::from("a"), ByteArray::from("b"), ByteArray::from("c")];
        let indices: Vec<u32> = vec![0, 1, 0, 2, 1];
        let bit_width = num_required_bits(2) as u8;
        let mut rle = crate::encodings::rle::RleEncoder::new(bit_width as usize);
        for &i in &indices {
            rle.put(i as u64);
        }
        let payload = rle.flush_buffer();
        let mut framed = vec![bit_width];
        framed.extend(payload);

        let mut dec: DictDecoder<ByteArrayType> = DictDecoder::new(dictionary.clone());
        dec.set_data(ByteBufferPtr::new(framed), indices.len()).unwrap();
        let mut out = vec![ByteArray::new(); indices.len()];
        let read = dec.get(&mut out).unwrap();
        assert_eq!(read, indices.len());
        let expected: Vec<ByteArray> = indices.iter().map(|&i| dictionary[i as usize].clone()).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_delta_length_byte_array_roundtrip() {
        let values = vec![ByteArray::from("a"), ByteArray::from("bb"), ByteArray::from("ccc")];
        let mut enc: DeltaLengthByteArrayEncoder<ByteArrayType> = DeltaLengthByteArrayEncoder::new();
        enc.put(&values).unwrap();
        let bytes = enc.flush_buffer().unwrap();

        let mut dec: DeltaLengthByteArrayDecoder<ByteArrayType> = DeltaLengthByteArrayDecoder::new();
        dec.set_data(ByteBufferPtr::new(bytes), values.len()).unwrap();
        let mut out = vec![ByteArray::new(); values.len()];
        let read = dec.get(&mut out).unwrap();
        assert_eq!(read, values.len());
        assert_eq!(out, values);
    }

    #[test]
    fn test_delta_byte_array_roundtrip() {
        let values =
            vec![ByteArray::from("hello"), ByteArray::from("help"), ByteArray::from("world")];
        let mut enc: DeltaByteArrayEncoder<ByteArrayType> = DeltaByteArrayEncoder::new();
        enc.put(&values).unwrap();
        let bytes = enc.flush_buffer().unwrap();

        let mut dec: DeltaByteArrayDecoder<ByteArrayType> = DeltaByteArrayDecoder::new();
        dec.set_data(ByteBufferPtr::new(bytes), values.len()).unwrap();
        let mut out = vec![ByteArray::new(); values.len()];
        let read = dec.get(&mut out).unwrap();
        assert_eq!(read, values.len());
        assert_eq!(out, values);
    }
}
