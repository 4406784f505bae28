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

//! The typed column reader: wraps a `PageReader`, threads pages through the
//! level decoders and the value decoder cache, and assembles `read_batch`'s
//! (values, levels) pairs.

use std::collections::HashMap;

use crate::basic::{Encoding, Type};
use crate::data_type::*;
use crate::encodings::decoding::{get_decoder, Decoder};
use crate::encodings::levels::LevelDecoder;
use crate::errors::Result;
use crate::schema::types::ColumnDescPtr;

use super::page::{Page, PageReader};

pub enum ColumnReader<'a> {
    BoolColumnReader(ColumnReaderImpl<'a, BoolType>),
    Int32ColumnReader(ColumnReaderImpl<'a, Int32Type>),
    Int64ColumnReader(ColumnReaderImpl<'a, Int64Type>),
    Int96ColumnReader(ColumnReaderImpl<'a, Int96Type>),
    FloatColumnReader(ColumnReaderImpl<'a, FloatType>),
    DoubleColumnReader(ColumnReaderImpl<'a, DoubleType>),
    ByteArrayColumnReader(ColumnReaderImpl<'a, ByteArrayType>),
    FixedLenByteArrayColumnReader(ColumnReaderImpl<'a, FixedLenByteArrayType>),
}

/// Builds the column reader matching `col_descr`'s physical type, reading
/// from `col_page_reader`.
pub fn get_column_reader<'a>(
    col_descr: ColumnDescPtr,
    col_page_reader: Box<dyn PageReader + 'a>,
) -> ColumnReader<'a> {
    match col_descr.physical_type() {
        Type::BOOLEAN => ColumnReader::BoolColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::INT32 => ColumnReader::Int32ColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::INT64 => ColumnReader::Int64ColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::INT96 => ColumnReader::Int96ColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::FLOAT => ColumnReader::FloatColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::DOUBLE => ColumnReader::DoubleColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader)),
        Type::BYTE_ARRAY => {
            ColumnReader::ByteArrayColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader))
        }
        Type::FIXED_LEN_BYTE_ARRAY => {
            ColumnReader::FixedLenByteArrayColumnReader(ColumnReaderImpl::new(col_descr, col_page_reader))
        }
    }
}

/// Unwraps a `ColumnReader` into the `ColumnReaderImpl` of the named variant,
/// panicking if the caller guessed the physical type wrong. No `unsafe`: the
/// match arm is the only thing doing the narrowing, same as matching any
/// other enum.
#[macro_export]
macro_rules! get_typed_column_reader {
    ($reader:expr, $variant:ident) => {
        match $reader {
            $crate::column::reader::ColumnReader::$variant(r) => r,
            other => panic!(
                "Expected a {} column reader, found a different physical type ({:?})",
                stringify!($variant),
                other.descr_physical_type()
            ),
        }
    };
}

impl<'a> ColumnReader<'a> {
    fn descr_physical_type(&self) -> Type {
        match self {
            ColumnReader::BoolColumnReader(r) => r.descr.physical_type(),
            ColumnReader::Int32ColumnReader(r) => r.descr.physical_type(),
            ColumnReader::Int64ColumnReader(r) => r.descr.physical_type(),
            ColumnReader::Int96ColumnReader(r) => r.descr.physical_type(),
            ColumnReader::FloatColumnReader(r) => r.descr.physical_type(),
            ColumnReader::DoubleColumnReader(r) => r.descr.physical_type(),
            ColumnReader::ByteArrayColumnReader(r) => r.descr.physical_type(),
            ColumnReader::FixedLenByteArrayColumnReader(r) => r.descr.physical_type(),
        }
    }
}

/// A value reader for a single primitive column. `'a` is the lifetime of the
/// page reader it was handed.
pub struct ColumnReaderImpl<'a, T: DataType> {
    descr: ColumnDescPtr,
    def_level_decoder: Option<LevelDecoder>,
    rep_level_decoder: Option<LevelDecoder>,
    page_reader: Box<dyn PageReader + 'a>,
    current_encoding: Option<Encoding>,

    num_buffered_values: u32,
    num_decoded_values: u32,

    dictionary: Option<Vec<T::T>>,
    decoders: HashMap<Encoding, Box<dyn Decoder<T>>>,
}

impl<'a, T: DataType> ColumnReaderImpl<'a, T> {
    pub fn new(descr: ColumnDescPtr, page_reader: Box<dyn PageReader + 'a>) -> Self {
        ColumnReaderImpl {
            descr,
            def_level_decoder: None,
            rep_level_decoder: None,
            page_reader,
            current_encoding: None,
            num_buffered_values: 0,
            num_decoded_values: 0,
            dictionary: None,
            decoders: HashMap::new(),
        }
    }

    fn type_length(&self) -> Option<usize> {
        T::type_length_for(self.descr.type_length())
    }

    /// Reads up to `batch_size` values into `values`, along with their
    /// definition/repetition levels if the caller wants them. Stops early,
    /// returning the count actually produced, once the underlying page
    /// reader runs dry.
    ///
    /// `values` may end up with fewer entries than `def_levels`/`rep_levels`
    /// when the column is optional and some levels are null.
    pub fn read_batch(
        &mut self,
        batch_size: usize,
        mut def_levels: Option<&mut [i16]>,
        mut rep_levels: Option<&mut [i16]>,
        values: &mut [T::T],
    ) -> Result<(usize, usize)> {
        let mut values_read = 0;
        let mut levels_read = 0;

        while values_read < batch_size {
            if !self.has_next()? {
                break;
            }

            let mut values_to_read = 0;
            let mut num_def_levels = 0;

            let next_levels_read =
                levels_read + std::cmp::min(batch_size - values_read, (self.num_buffered_values - self.num_decoded_values) as usize);

            if self.descr.max_def_level() > 0 {
                if let Some(levels) = def_levels.as_deref_mut() {
                    assert!(
                        levels.len() >= next_levels_read,
                        "def_levels.len() ({}) must be at least {}",
                        levels.len(),
                        next_levels_read
                    );
                    num_def_levels = self.read_def_levels(&mut levels[levels_read..next_levels_read])?;
                    for &level in &levels[levels_read..levels_read + num_def_levels] {
                        if level == self.descr.max_def_level() {
                            values_to_read += 1;
                        }
                    }
                } else {
                    // Caller doesn't want levels but the column is optional —
                    // still have to consume them to stay in sync.
                    let mut scratch = vec![0i16; next_levels_read - levels_read];
                    num_def_levels = self.read_def_levels(&mut scratch)?;
                    values_to_read =
                        scratch[..num_def_levels].iter().filter(|&&l| l == self.descr.max_def_level()).count();
                }
            } else {
                values_to_read = std::cmp::min(
                    batch_size - values_read,
                    (self.num_buffered_values - self.num_decoded_values) as usize,
                );
                num_def_levels = values_to_read;
            }

            if self.descr.max_rep_level() > 0 {
                if let Some(levels) = rep_levels.as_deref_mut() {
                    assert!(levels.len() >= next_levels_read, "rep_levels.len() must be at least {}", next_levels_read);
                    let num_rep_levels = self.read_rep_levels(&mut levels[levels_read..next_levels_read])?;
                    assert_eq!(num_def_levels, num_rep_levels, "Number of decoded rep / def levels did not match");
                }
            }
            levels_read = next_levels_read;

            assert!(
                values.len() >= values_read + values_to_read,
                "values.len() must be at least {}",
                values_read + values_to_read
            );
            let curr_values_read = self.read_values(&mut values[values_read..values_read + values_to_read])?;
            self.num_decoded_values += std::cmp::max(num_def_levels, curr_values_read) as u32;
            values_read += curr_values_read;
        }

        Ok((values_read, levels_read))
    }

    /// Pulls the next page from the page reader, consuming any dictionary
    /// pages along the way, and sets up the level/value decoders for it.
    /// Returns `false` once the page reader is exhausted.
    fn read_new_page(&mut self) -> Result<bool> {
        loop {
            match self.page_reader.get_next_page()? {
                None => return Ok(false),
                Some(Page::DictionaryPage { buf, num_values, encoding, .. }) => {
                    self.configure_dictionary(buf, num_values, encoding)?;
                }
                Some(Page::IndexPage { .. }) => {
                    // Opaque passthrough, never interpreted here.
                    continue;
                }
                Some(Page::DataPage { buf, num_values, mut encoding, def_level_encoding, rep_level_encoding, .. }) => {
                    self.num_buffered_values = num_values;
                    self.num_decoded_values = 0;

                    let mut cursor = buf;

                    if self.descr.max_rep_level() > 0 {
                        let mut decoder = LevelDecoder::new(self.descr.max_rep_level());
                        let consumed = decoder.set_data_with_length_prefix(cursor.clone())?;
                        cursor = cursor.start_from(consumed);
                        self.rep_level_decoder = Some(decoder);
                    }
                    if self.descr.max_def_level() > 0 {
                        let mut decoder = LevelDecoder::new(self.descr.max_def_level());
                        let consumed = decoder.set_data_with_length_prefix(cursor.clone())?;
                        cursor = cursor.start_from(consumed);
                        self.def_level_decoder = Some(decoder);
                    }

                    if encoding == Encoding::PLAIN_DICTIONARY {
                        encoding = Encoding::RLE_DICTIONARY;
                    }
                    self.bind_value_decoder(encoding, cursor, num_values as usize)?;
                    return Ok(true);
                }
                Some(Page::DataPageV2 {
                    buf,
                    num_values,
                    mut encoding,
                    def_levels_byte_len,
                    rep_levels_byte_len,
                    ..
                }) => {
                    self.num_buffered_values = num_values;
                    self.num_decoded_values = 0;

                    let mut cursor = buf;

                    if self.descr.max_rep_level() > 0 {
                        let mut decoder = LevelDecoder::new(self.descr.max_rep_level());
                        let rep_bytes = cursor.range(0, rep_levels_byte_len as usize);
                        decoder.set_data(rep_bytes);
                        cursor = cursor.start_from(rep_levels_byte_len as usize);
                        self.rep_level_decoder = Some(decoder);
                    }
                    if self.descr.max_def_level() > 0 {
                        let mut decoder = LevelDecoder::new(self.descr.max_def_level());
                        let def_bytes = cursor.range(0, def_levels_byte_len as usize);
                        decoder.set_data(def_bytes);
                        cursor = cursor.start_from(def_levels_byte_len as usize);
                        self.def_level_decoder = Some(decoder);
                    }

                    if encoding == Encoding::PLAIN_DICTIONARY {
                        encoding = Encoding::RLE_DICTIONARY;
                    }
                    self.bind_value_decoder(encoding, cursor, num_values as usize)?;
                    return Ok(true);
                }
            }
        }
    }

    fn bind_value_decoder(
        &mut self,
        encoding: Encoding,
        data: crate::util::memory::ByteBufferPtr,
        num_values: usize,
    ) -> Result<()> {
        if !self.decoders.contains_key(&encoding) {
            let dict = self.dictionary.as_deref();
            let decoder = get_decoder::<T>(encoding, self.type_length(), dict)?;
            self.decoders.insert(encoding, decoder);
        }
        let decoder = self.decoders.get_mut(&encoding).unwrap();
        decoder.set_data(data, num_values)?;
        self.current_encoding = Some(encoding);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.num_buffered_values == 0 || self.num_buffered_values == self.num_decoded_values {
            if !self.read_new_page()? {
                Ok(false)
            } else {
                Ok(self.num_buffered_values != 0)
            }
        } else {
            Ok(true)
        }
    }

    fn read_rep_levels(&mut self, buffer: &mut [i16]) -> Result<usize> {
        let decoder = self.rep_level_decoder.as_mut().expect("rep_level_decoder must be set");
        decoder.get_batch(buffer)
    }

    fn read_def_levels(&mut self, buffer: &mut [i16]) -> Result<usize> {
        let decoder = self.def_level_decoder.as_mut().expect("def_level_decoder must be set");
        decoder.get_batch(buffer)
    }

    fn read_values(&mut self, buffer: &mut [T::T]) -> Result<usize> {
        let encoding = self.current_encoding.expect("current_encoding must be set");
        let decoder = self.decoders.get_mut(&encoding).expect("decoder for current encoding must be set");
        decoder.get(buffer)
    }

    /// Materializes a dictionary page's values into memory so later
    /// RLE_DICTIONARY data pages on this column can be decoded against it.
    /// Fatal if called twice: a column chunk may carry at most one
    /// dictionary page.
    fn configure_dictionary(
        &mut self,
        buf: crate::util::memory::ByteBufferPtr,
        num_values: u32,
        _encoding: Encoding,
    ) -> Result<()> {
        if self.dictionary.is_some() {
            return Err(general_err!("Column cannot have more than one dictionary page"));
        }
        let mut plain = crate::encodings::decoding::PlainDecoder::<T>::new(self.type_length());
        plain.set_data(buf, num_values as usize)?;
        let mut values = vec![T::T::default(); num_values as usize];
        let read = plain.get(&mut values)?;
        values.truncate(read);
        self.dictionary = Some(values);
        self.decoders.remove(&Encoding::RLE_DICTIONARY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Repetition;
    use crate::column::page::Page;
    use crate::encodings::encoding::{DictEncoder, Encoder, PlainEncoder};
    use crate::encodings::levels::LevelEncoder;
    use crate::schema::types::{ColumnDescriptor, ColumnPath, PrimitiveTypeInfo};
    use crate::util::memory::ByteBufferPtr;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct VecPageReader {
        pages: VecDeque<Page>,
    }

    impl VecPageReader {
        fn new(pages: Vec<Page>) -> Self {
            VecPageReader { pages: pages.into() }
        }
    }

    impl PageReader for VecPageReader {
        fn get_next_page(&mut self) -> Result<Option<Page>> {
            Ok(self.pages.pop_front())
        }
    }

    fn int32_descr(max_def: i16, max_rep: i16) -> ColumnDescPtr {
        let type_info = PrimitiveTypeInfo::primitive_type_builder("a", Type::INT32)
            .with_repetition(if max_def > 0 { Repetition::OPTIONAL } else { Repetition::REQUIRED })
            .build()
            .unwrap();
        Rc::new(ColumnDescriptor::new(Rc::new(type_info), max_def, max_rep, ColumnPath::new(vec!["a".to_string()])))
    }

    #[test]
    fn test_read_plain_required_non_repeated() {
        let descr = int32_descr(0, 0);
        let mut enc: PlainEncoder<Int32Type> = PlainEncoder::new(None);
        let values: Vec<i32> = (0..20).collect();
        enc.put(&values).unwrap();
        let buf = enc.flush_buffer().unwrap();
        let page = Page::DataPage {
            buf: ByteBufferPtr::new(buf),
            num_values: 20,
            encoding: Encoding::PLAIN,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            statistics: None,
        };
        let reader = get_column_reader(descr, Box::new(VecPageReader::new(vec![page])));
        let mut typed = get_typed_column_reader!(reader, Int32ColumnReader);
        let mut out = vec![0i32; 20];
        let (values_read, levels_read) = typed.read_batch(20, None, None, &mut out).unwrap();
        assert_eq!(values_read, 20);
        assert_eq!(levels_read, 0);
        assert_eq!(out, values);
    }

    #[test]
    fn test_read_plain_optional_with_nulls() {
        let descr = int32_descr(1, 0);
        let present_values: Vec<i32> = vec![10, 20, 30];
        let mut enc: PlainEncoder<Int32Type> = PlainEncoder::new(None);
        enc.put(&present_values).unwrap();
        let value_bytes = enc.flush_buffer().unwrap();

        let defs = [1i16, 0, 1, 1, 0];
        let mut level_enc = LevelEncoder::new(1);
        level_enc.put_batch(&defs);
        let level_bytes = level_enc.flush_buffer();

        let mut rep_framed = Vec::new();
        rep_framed.extend_from_slice(&0u32.to_le_bytes());
        let mut def_framed = Vec::new();
        def_framed.extend_from_slice(&(level_bytes.len() as u32).to_le_bytes());
        def_framed.extend_from_slice(&level_bytes);

        let mut buf = Vec::new();
        buf.extend_from_slice(&rep_framed);
        buf.extend_from_slice(&def_framed);
        buf.extend_from_slice(&value_bytes);

        let page = Page::DataPage {
            buf: ByteBufferPtr::new(buf),
            num_values: defs.len() as u32,
            encoding: Encoding::PLAIN,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            statistics: None,
        };
        let reader = get_column_reader(descr, Box::new(VecPageReader::new(vec![page])));
        let mut typed = get_typed_column_reader!(reader, Int32ColumnReader);
        let mut values = vec![0i32; 5];
        let mut def_levels = vec![0i16; 5];
        let (values_read, levels_read) = typed.read_batch(5, Some(&mut def_levels), None, &mut values).unwrap();
        assert_eq!(levels_read, 5);
        assert_eq!(def_levels, defs);
        assert_eq!(values_read, 3);
        assert_eq!(&values[..3], &present_values[..]);
    }

    #[test]
    fn test_read_dictionary_encoded() {
        let descr = int32_descr(0, 0);
        let values = [5i32, 6, 5, 7, 6, 5];
        let mut dict_enc: DictEncoder<Int32Type> = DictEncoder::new(1024);
        dict_enc.put(&values).unwrap();
        let dict_bytes = dict_enc.write_dictionary_page(None);
        let index_bytes = dict_enc.flush_buffer().unwrap();

        let dict_page =
            Page::DictionaryPage { buf: ByteBufferPtr::new(dict_bytes), num_values: dict_enc.num_entries() as u32, encoding: Encoding::PLAIN, is_sorted: false };
        let data_page = Page::DataPage {
            buf: ByteBufferPtr::new(index_bytes),
            num_values: values.len() as u32,
            encoding: Encoding::RLE_DICTIONARY,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            statistics: None,
        };
        let reader = get_column_reader(descr, Box::new(VecPageReader::new(vec![dict_page, data_page])));
        let mut typed = get_typed_column_reader!(reader, Int32ColumnReader);
        let mut out = vec![0i32; values.len()];
        let (values_read, _) = typed.read_batch(values.len(), None, None, &mut out).unwrap();
        assert_eq!(values_read, values.len());
        assert_eq!(out, values);
    }

    #[test]
    fn test_second_dictionary_page_is_fatal() {
        let descr = int32_descr(0, 0);
        let mut plain: PlainEncoder<Int32Type> = PlainEncoder::new(None);
        plain.put(&[1, 2, 3]).unwrap();
        let bytes = plain.flush_buffer().unwrap();
        let page = || Page::DictionaryPage {
            buf: ByteBufferPtr::new(bytes.clone()),
            num_values: 3,
            encoding: Encoding::PLAIN,
            is_sorted: false,
        };
        let reader = get_column_reader(descr, Box::new(VecPageReader::new(vec![page(), page()])));
        let mut typed = get_typed_column_reader!(reader, Int32ColumnReader);
        let mut out = vec![0i32; 3];
        assert!(typed.read_batch(3, None, None, &mut out).is_err());
    }
}
