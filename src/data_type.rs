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

//! The eight physical types, modeled as zero-sized marker types implementing
//! `DataType`. This avoids pervasive value-boxing: each marker type names an
//! associated value type `T`, and the per-type wire behaviour needed by the
//! generic codecs (plain encode/decode, value size, min/max byte form) lives
//! on `ParquetValueType`, implemented once per value type rather than via
//! specialized trait impls.

use std::cmp::Ordering;
use std::fmt;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use ordered_float::OrderedFloat;

use crate::basic::Type;
use crate::errors::{ParquetError, Result};
use crate::util::memory::ByteBufferPtr;

/// A 96-bit integer, stored as three `u32` words, little-endian word order.
/// No arithmetic meaning is assigned to it by this crate; it is opaque
/// 12-byte storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Int96 {
    value: [u32; 3],
}

impl Int96 {
    pub fn new() -> Self {
        Int96 { value: [0; 3] }
    }

    pub fn data(&self) -> &[u32] {
        &self.value
    }

    pub fn set_data(&mut self, v: Vec<u32>) {
        assert_eq!(v.len(), 3);
        self.value.copy_from_slice(&v);
    }
}

impl From<Vec<u32>> for Int96 {
    fn from(v: Vec<u32>) -> Self {
        let mut i = Int96::new();
        i.set_data(v);
        i
    }
}

/// A variable-length byte sequence, also used (with `type_length` supplying
/// the fixed width) for FIXED_LEN_BYTE_ARRAY columns.
#[derive(Clone, Debug, Default)]
pub struct ByteArray {
    data: Option<ByteBufferPtr>,
}

impl ByteArray {
    pub fn new() -> Self {
        ByteArray { data: None }
    }

    pub fn data(&self) -> &[u8] {
        match &self.data {
            Some(b) => b.as_ref(),
            None => &[],
        }
    }

    pub fn set_data(&mut self, data: ByteBufferPtr) {
        self.data = Some(data);
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(v: Vec<u8>) -> Self {
        let mut b = ByteArray::new();
        b.set_data(ByteBufferPtr::new(v));
        b
    }
}

impl<'a> From<&'a str> for ByteArray {
    fn from(s: &'a str) -> Self {
        ByteArray::from(s.as_bytes().to_vec())
    }
}

impl PartialEq for ByteArray {
    fn eq(&self, other: &Self) -> bool {
        self.data() == other.data()
    }
}

impl PartialOrd for ByteArray {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.data().partial_cmp(other.data())
    }
}

/// Per-value-type operations needed by the generic plain codec, dictionary
/// store and column statistics. Implemented once per concrete value type —
/// `bool`, `i32`, `i64`, `Int96`, `f32`, `f64`, `ByteArray` — instead of via
/// specialized impls of `Decoder<T>`/`Encoder<T>`.
pub trait ParquetValueType: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Reads `num_values` values from `data` starting at byte `start`, plain
    /// encoded. `type_length` is `Some(L)` for FIXED_LEN_BYTE_ARRAY, `None`
    /// otherwise. Returns the decoded values and the number of bytes
    /// consumed.
    fn read_plain(
        data: &ByteBufferPtr,
        start: usize,
        num_values: usize,
        type_length: Option<usize>,
    ) -> Result<(Vec<Self>, usize)>;

    /// Appends the plain encoding of `values` to `sink`.
    fn write_plain(values: &[Self], type_length: Option<usize>, sink: &mut Vec<u8>);

    /// Byte size of this value for dictionary/page-size budgeting. Returns 0
    /// for booleans, suppressing dictionary attempts on boolean columns.
    fn value_size(&self) -> usize;

    /// Little-endian byte encoding used for min/max statistics. Booleans
    /// never produce statistics (caller suppresses at a higher level); this
    /// is still defined for completeness.
    fn to_stat_bytes(&self) -> Vec<u8>;

    /// `Some` for the two integer physical types the delta-binary-packed
    /// codec applies to; `None` otherwise. Lets the generic delta
    /// encoder/decoder dispatch without a runtime type check.
    fn as_delta_i64(&self) -> Option<i64> {
        None
    }

    fn from_delta_i64(_v: i64) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    /// `Some` for BYTE_ARRAY/FIXED_LEN_BYTE_ARRAY, backing the delta-length
    /// and delta-byte-array codecs.
    fn as_byte_slice(&self) -> Option<&[u8]> {
        None
    }

    fn from_owned_bytes(_bytes: ByteBufferPtr) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    /// True only for `bool`: the RLE physical encoding, used directly rather
    /// than as the hybrid codec's bit-packed half, is only ever applied to
    /// boolean columns.
    fn supports_rle_value_encoding() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// Inverse of the bit read back by the RLE value decoder. `Some` only
    /// for `bool`.
    fn from_bool(_v: bool) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    /// Folds `self` into the running min/max, or leaves them untouched for
    /// types that never produce statistics (booleans, Int96). Default is a
    /// no-op; numeric and byte-array types override it.
    fn update_stats(&self, _min: &mut Option<Self>, _max: &mut Option<Self>)
    where
        Self: Sized,
    {
    }
}

impl ParquetValueType for bool {
    fn read_plain(
        data: &ByteBufferPtr,
        start: usize,
        num_values: usize,
        _type_length: Option<usize>,
    ) -> Result<(Vec<bool>, usize)> {
        let needed_bytes = (num_values + 7) / 8;
        if data.len() < start + needed_bytes {
            return Err(eof_err!("Not enough bytes to decode {} booleans", num_values));
        }
        let bytes = data.range(start, needed_bytes);
        let mut out = Vec::with_capacity(num_values);
        for i in 0..num_values {
            let byte = bytes.as_ref()[i / 8];
            out.push((byte >> (i % 8)) & 1 == 1);
        }
        Ok((out, needed_bytes))
    }

    fn write_plain(values: &[bool], _type_length: Option<usize>, sink: &mut Vec<u8>) {
        let nbytes = (values.len() + 7) / 8;
        let mut bytes = vec![0u8; nbytes];
        for (i, &v) in values.iter().enumerate() {
            if v {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        sink.extend_from_slice(&bytes);
    }

    fn value_size(&self) -> usize {
        0
    }

    fn to_stat_bytes(&self) -> Vec<u8> {
        vec![if *self { 1 } else { 0 }]
    }

    fn supports_rle_value_encoding() -> bool {
        true
    }

    fn from_bool(v: bool) -> Option<Self> {
        Some(v)
    }
}

macro_rules! impl_value_type_for_int {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl ParquetValueType for $ty {
            fn read_plain(
                data: &ByteBufferPtr,
                start: usize,
                num_values: usize,
                _type_length: Option<usize>,
            ) -> Result<(Vec<Self>, usize)> {
                let nbytes = $size * num_values;
                if data.len() < start + nbytes {
                    return Err(eof_err!("Not enough bytes to decode values"));
                }
                let slice = data.range(start, nbytes);
                let bytes = slice.as_ref();
                let mut out = Vec::with_capacity(num_values);
                for i in 0..num_values {
                    out.push(LittleEndian::$read(&bytes[i * $size..(i + 1) * $size]));
                }
                Ok((out, nbytes))
            }

            fn write_plain(values: &[Self], _type_length: Option<usize>, sink: &mut Vec<u8>) {
                for v in values {
                    sink.$write::<LittleEndian>(*v).expect("Vec<u8> writes never fail");
                }
            }

            fn value_size(&self) -> usize {
                $size
            }

            fn to_stat_bytes(&self) -> Vec<u8> {
                let mut out = Vec::with_capacity($size);
                out.$write::<LittleEndian>(*self).expect("Vec<u8> writes never fail");
                out
            }

            fn update_stats(&self, min: &mut Option<Self>, max: &mut Option<Self>) {
                // A running min seeded at a finite value that only ever sees
                // NaN afterwards must not update.
                if self.is_nan() {
                    return;
                }
                if min.map_or(true, |m| OrderedFloat(*self) < OrderedFloat(m)) {
                    *min = Some(*self);
                }
                if max.map_or(true, |m| OrderedFloat(*self) > OrderedFloat(m)) {
                    *max = Some(*self);
                }
            }
        }
    };
}

impl_value_type_for_int!(f32, 4, read_f32, write_f32);
impl_value_type_for_int!(f64, 8, read_f64, write_f64);

macro_rules! impl_value_type_for_delta_int {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl ParquetValueType for $ty {
            fn read_plain(
                data: &ByteBufferPtr,
                start: usize,
                num_values: usize,
                _type_length: Option<usize>,
            ) -> Result<(Vec<Self>, usize)> {
                let nbytes = $size * num_values;
                if data.len() < start + nbytes {
                    return Err(eof_err!("Not enough bytes to decode values"));
                }
                let slice = data.range(start, nbytes);
                let bytes = slice.as_ref();
                let mut out = Vec::with_capacity(num_values);
                for i in 0..num_values {
                    out.push(LittleEndian::$read(&bytes[i * $size..(i + 1) * $size]));
                }
                Ok((out, nbytes))
            }

            fn write_plain(values: &[Self], _type_length: Option<usize>, sink: &mut Vec<u8>) {
                for v in values {
                    sink.$write::<LittleEndian>(*v).expect("Vec<u8> writes never fail");
                }
            }

            fn value_size(&self) -> usize {
                $size
            }

            fn to_stat_bytes(&self) -> Vec<u8> {
                let mut out = Vec::with_capacity($size);
                out.$write::<LittleEndian>(*self).expect("Vec<u8> writes never fail");
                out
            }

            fn as_delta_i64(&self) -> Option<i64> {
                Some(*self as i64)
            }

            fn from_delta_i64(v: i64) -> Option<Self> {
                Some(v as $ty)
            }

            fn update_stats(&self, min: &mut Option<Self>, max: &mut Option<Self>) {
                if min.map_or(true, |m| *self < m) {
                    *min = Some(*self);
                }
                if max.map_or(true, |m| *self > m) {
                    *max = Some(*self);
                }
            }
        }
    };
}

impl_value_type_for_delta_int!(i32, 4, read_i32, write_i32);
impl_value_type_for_delta_int!(i64, 8, read_i64, write_i64);

impl ParquetValueType for Int96 {
    fn read_plain(
        data: &ByteBufferPtr,
        start: usize,
        num_values: usize,
        _type_length: Option<usize>,
    ) -> Result<(Vec<Int96>, usize)> {
        let nbytes = 12 * num_values;
        if data.len() < start + nbytes {
            return Err(eof_err!("Not enough bytes to decode INT96 values"));
        }
        let slice = data.range(start, nbytes);
        let bytes = slice.as_ref();
        let mut out = Vec::with_capacity(num_values);
        for i in 0..num_values {
            let base = i * 12;
            let mut words = Vec::with_capacity(3);
            for w in 0..3 {
                words.push(LittleEndian::read_u32(&bytes[base + w * 4..base + w * 4 + 4]));
            }
            out.push(Int96::from(words));
        }
        Ok((out, nbytes))
    }

    fn write_plain(values: &[Int96], _type_length: Option<usize>, sink: &mut Vec<u8>) {
        for v in values {
            for w in v.data() {
                sink.write_u32::<LittleEndian>(*w).expect("Vec<u8> writes never fail");
            }
        }
    }

    fn value_size(&self) -> usize {
        12
    }

    fn to_stat_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        for w in self.data() {
            out.write_u32::<LittleEndian>(*w).expect("Vec<u8> writes never fail");
        }
        out
    }
}

impl ParquetValueType for ByteArray {
    fn read_plain(
        data: &ByteBufferPtr,
        start: usize,
        num_values: usize,
        type_length: Option<usize>,
    ) -> Result<(Vec<ByteArray>, usize)> {
        let mut out = Vec::with_capacity(num_values);
        let mut pos = start;
        match type_length {
            Some(len) => {
                for _ in 0..num_values {
                    if data.len() < pos + len {
                        return Err(eof_err!("Not enough bytes to decode fixed-length array"));
                    }
                    let mut b = ByteArray::new();
                    b.set_data(data.range(pos, len));
                    out.push(b);
                    pos += len;
                }
            }
            None => {
                for _ in 0..num_values {
                    if data.len() < pos + 4 {
                        return Err(eof_err!("Not enough bytes to decode array length"));
                    }
                    let len_bytes = data.range(pos, 4);
                    let len = LittleEndian::read_u32(len_bytes.as_ref()) as usize;
                    pos += 4;
                    if data.len() < pos + len {
                        return Err(eof_err!("Not enough bytes to decode array data"));
                    }
                    let mut b = ByteArray::new();
                    b.set_data(data.range(pos, len));
                    out.push(b);
                    pos += len;
                }
            }
        }
        Ok((out, pos - start))
    }

    fn write_plain(values: &[ByteArray], type_length: Option<usize>, sink: &mut Vec<u8>) {
        for v in values {
            if type_length.is_none() {
                sink.write_u32::<LittleEndian>(v.len() as u32).expect("Vec<u8> writes never fail");
            }
            sink.extend_from_slice(v.data());
        }
    }

    fn value_size(&self) -> usize {
        self.len()
    }

    fn to_stat_bytes(&self) -> Vec<u8> {
        self.data().to_vec()
    }

    fn as_byte_slice(&self) -> Option<&[u8]> {
        Some(self.data())
    }

    fn from_owned_bytes(bytes: ByteBufferPtr) -> Option<Self> {
        let mut b = ByteArray::new();
        b.set_data(bytes);
        Some(b)
    }

    fn update_stats(&self, min: &mut Option<Self>, max: &mut Option<Self>) {
        if min.as_ref().map_or(true, |m| self < m) {
            *min = Some(self.clone());
        }
        if max.as_ref().map_or(true, |m| self > m) {
            *max = Some(self.clone());
        }
    }
}

/// Marker-type front door for the generic codecs, keyed by physical type.
pub trait DataType: 'static + Send + Sync {
    type T: ParquetValueType;

    fn get_physical_type() -> Type;

    /// Some(L) only for FIXED_LEN_BYTE_ARRAY.
    fn type_length_for(type_length: i32) -> Option<usize> {
        let _ = type_length;
        None
    }
}

macro_rules! make_data_type {
    ($name:ident, $native:ty, $physical:expr) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name;

        impl DataType for $name {
            type T = $native;

            fn get_physical_type() -> Type {
                $physical
            }
        }
    };
}

make_data_type!(BoolType, bool, Type::BOOLEAN);
make_data_type!(Int32Type, i32, Type::INT32);
make_data_type!(Int64Type, i64, Type::INT64);
make_data_type!(Int96Type, Int96, Type::INT96);
make_data_type!(FloatType, f32, Type::FLOAT);
make_data_type!(DoubleType, f64, Type::DOUBLE);
make_data_type!(ByteArrayType, ByteArray, Type::BYTE_ARRAY);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedLenByteArrayType;

impl DataType for FixedLenByteArrayType {
    type T = ByteArray;

    fn get_physical_type() -> Type {
        Type::FIXED_LEN_BYTE_ARRAY
    }

    fn type_length_for(type_length: i32) -> Option<usize> {
        if type_length >= 0 {
            Some(type_length as usize)
        } else {
            None
        }
    }
}

/// Checks that `descr_type` (from a chunk header) matches `T`'s physical
/// type.
pub fn assert_physical_type<T: DataType>(descr_type: Type) -> Result<()> {
    if descr_type != T::get_physical_type() {
        return Err(general_err!(
            "Physical type mismatch: column declares {}, decoder is for {}",
            descr_type,
            T::get_physical_type()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_array_ordering() {
        let a = ByteArray::from("aa");
        let b = ByteArray::from("ab");
        assert!(a < b);
    }

    #[test]
    fn test_int96_roundtrip() {
        let i = Int96::from(vec![1, 2, 3]);
        assert_eq!(i.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_plain_roundtrip_i32() {
        let values = vec![1i32, -2, i32::MAX, i32::MIN];
        let mut buf = Vec::new();
        i32::write_plain(&values, None, &mut buf);
        let ptr = ByteBufferPtr::new(buf);
        let (decoded, consumed) = i32::read_plain(&ptr, 0, values.len(), None).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(consumed, values.len() * 4);
    }

    #[test]
    fn test_plain_roundtrip_bool() {
        let values = vec![true, false, true, true, false, false, true, false, true];
        let mut buf = Vec::new();
        bool::write_plain(&values, None, &mut buf);
        let ptr = ByteBufferPtr::new(buf);
        let (decoded, _) = bool::read_plain(&ptr, 0, values.len(), None).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_plain_roundtrip_byte_array() {
        let values = vec![ByteArray::from("hello"), ByteArray::from("parquet")];
        let mut buf = Vec::new();
        ByteArray::write_plain(&values, None, &mut buf);
        let ptr = ByteBufferPtr::new(buf);
        let (decoded, _) = ByteArray::read_plain(&ptr, 0, values.len(), None).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_plain_roundtrip_fixed_len_byte_array() {
        let values = vec![ByteArray::from("bird"), ByteArray::from("come")];
        let mut buf = Vec::new();
        ByteArray::write_plain(&values, Some(4), &mut buf);
        assert_eq!(buf.len(), 8);
        let ptr = ByteBufferPtr::new(buf);
        let (decoded, _) = ByteArray::read_plain(&ptr, 0, values.len(), Some(4)).unwrap();
        assert_eq!(decoded, values);
    }
}
