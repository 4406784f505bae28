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

//! Write side of the typed column store: buffers one column's values
//! alongside their levels, tracks running min/max, and decides between
//! dictionary and plain encoding at flush time.

use crate::basic::Encoding;
use crate::data_type::*;
use crate::encodings::encoding::{DictEncoder, Encoder, PlainEncoder};
use crate::encodings::levels::LevelEncoder;
use crate::errors::Result;
use crate::schema::types::ColumnDescPtr;
use crate::util::memory::ByteBufferPtr;

use super::page::{Page, PageStatistics, PageWriter};

const DEFAULT_DICTIONARY_SIZE_LIMIT: usize = 1024 * 1024;

pub enum ColumnWriter<'a> {
    BoolColumnWriter(ColumnWriterImpl<'a, BoolType>),
    Int32ColumnWriter(ColumnWriterImpl<'a, Int32Type>),
    Int64ColumnWriter(ColumnWriterImpl<'a, Int64Type>),
    Int96ColumnWriter(ColumnWriterImpl<'a, Int96Type>),
    FloatColumnWriter(ColumnWriterImpl<'a, FloatType>),
    DoubleColumnWriter(ColumnWriterImpl<'a, DoubleType>),
    ByteArrayColumnWriter(ColumnWriterImpl<'a, ByteArrayType>),
    FixedLenByteArrayColumnWriter(ColumnWriterImpl<'a, FixedLenByteArrayType>),
}

pub fn get_column_writer<'a>(
    descr: ColumnDescPtr,
    page_writer: Box<dyn PageWriter + 'a>,
) -> ColumnWriter<'a> {
    use crate::basic::Type;
    match descr.physical_type() {
        Type::BOOLEAN => ColumnWriter::BoolColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::INT32 => ColumnWriter::Int32ColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::INT64 => ColumnWriter::Int64ColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::INT96 => ColumnWriter::Int96ColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::FLOAT => ColumnWriter::FloatColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::DOUBLE => ColumnWriter::DoubleColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::BYTE_ARRAY => ColumnWriter::ByteArrayColumnWriter(ColumnWriterImpl::new(descr, page_writer)),
        Type::FIXED_LEN_BYTE_ARRAY => {
            ColumnWriter::FixedLenByteArrayColumnWriter(ColumnWriterImpl::new(descr, page_writer))
        }
    }
}

/// Unwraps a `ColumnWriter` into the `ColumnWriterImpl` of the named variant.
#[macro_export]
macro_rules! get_typed_column_writer {
    ($writer:expr, $variant:ident) => {
        match $writer {
            $crate::column::writer::ColumnWriter::$variant(w) => w,
            _ => panic!("Expected a {} column writer, found a different physical type", stringify!($variant)),
        }
    };
}

/// One column's buffered values plus their (d, r) level streams, written out
/// as dictionary or plain pages on `close`.
pub struct ColumnWriterImpl<'a, T: DataType> {
    descr: ColumnDescPtr,
    page_writer: Box<dyn PageWriter + 'a>,

    def_levels: Vec<i16>,
    rep_levels: Vec<i16>,
    values: Vec<T::T>,

    allow_dict: bool,
    dict_size_limit: usize,

    min: Option<T::T>,
    max: Option<T::T>,

    num_buffered_rows: u32,
    total_rows_written: u64,
    total_bytes_written: u64,
}

impl<'a, T: DataType> ColumnWriterImpl<'a, T> {
    pub fn new(descr: ColumnDescPtr, page_writer: Box<dyn PageWriter + 'a>) -> Self {
        ColumnWriterImpl {
            descr,
            page_writer,
            def_levels: Vec::new(),
            rep_levels: Vec::new(),
            values: Vec::new(),
            allow_dict: true,
            dict_size_limit: DEFAULT_DICTIONARY_SIZE_LIMIT,
            min: None,
            max: None,
            num_buffered_rows: 0,
            total_rows_written: 0,
            total_bytes_written: 0,
        }
    }

    pub fn with_dictionary_size_limit(mut self, limit: usize) -> Self {
        self.dict_size_limit = limit;
        self
    }

    pub fn disable_dictionary(mut self) -> Self {
        self.allow_dict = false;
        self
    }

    /// Appends one logical row's worth of (value, definition level,
    /// repetition level). `value` is `None` for a null slot.
    pub fn write_batch(
        &mut self,
        values: &[T::T],
        def_levels: Option<&[i16]>,
        rep_levels: Option<&[i16]>,
    ) -> Result<usize> {
        let num_levels = match def_levels {
            Some(d) => d.len(),
            None => values.len(),
        };
        if let Some(r) = rep_levels {
            if r.len() != num_levels {
                return Err(general_err!(
                    "Repetition levels length {} does not match definition levels length {}",
                    r.len(),
                    num_levels
                ));
            }
            self.rep_levels.extend_from_slice(r);
        } else if self.descr.max_rep_level() > 0 {
            return Err(general_err!("Column has a repeated ancestor but no repetition levels were given"));
        }

        let mut value_idx = 0;
        if let Some(d) = def_levels {
            for &level in d {
                if level > self.descr.max_def_level() {
                    return Err(general_err!(
                        "Definition level {} exceeds column max {}",
                        level,
                        self.descr.max_def_level()
                    ));
                }
                self.def_levels.push(level);
                if level == self.descr.max_def_level() {
                    self.push_value(values[value_idx].clone());
                    value_idx += 1;
                }
            }
        } else {
            for v in values {
                self.def_levels.push(self.descr.max_def_level());
                self.push_value(v.clone());
            }
        }

        self.num_buffered_rows += num_levels as u32;
        Ok(values.len())
    }

    fn push_value(&mut self, v: T::T) {
        v.update_stats(&mut self.min, &mut self.max);
        self.values.push(v);
    }

    fn type_length(&self) -> Option<usize> {
        T::type_length_for(self.descr.type_length())
    }

    /// Flushes currently buffered rows as a single data page, choosing
    /// dictionary vs plain encoding for the whole page at once (the
    /// no-dict-mode decision is committed at flush time, not mid-page).
    pub fn flush_data_page(&mut self) -> Result<()> {
        if self.num_buffered_rows == 0 {
            return Ok(());
        }

        let mut rep_buf = Vec::new();
        if self.descr.max_rep_level() > 0 {
            let mut enc = LevelEncoder::new(self.descr.max_rep_level());
            enc.put_batch(&self.rep_levels);
            rep_buf = enc.flush_buffer();
        }
        let mut def_buf = Vec::new();
        if self.descr.max_def_level() > 0 {
            let mut enc = LevelEncoder::new(self.descr.max_def_level());
            enc.put_batch(&self.def_levels);
            def_buf = enc.flush_buffer();
        }

        let (value_bytes, encoding) = self.encode_values()?;

        let mut buf = Vec::with_capacity(4 + rep_buf.len() + 4 + def_buf.len() + value_bytes.len());
        buf.extend_from_slice(&(rep_buf.len() as u32).to_le_bytes());
        buf.extend_from_slice(&rep_buf);
        buf.extend_from_slice(&(def_buf.len() as u32).to_le_bytes());
        buf.extend_from_slice(&def_buf);
        buf.extend_from_slice(&value_bytes);

        let statistics = if let (Some(min), Some(max)) = (&self.min, &self.max) {
            Some(PageStatistics {
                min: Some(min.to_stat_bytes()),
                max: Some(max.to_stat_bytes()),
                null_count: Some((self.def_levels.len() - self.values.len()) as i64),
                distinct_count: None,
            })
        } else {
            None
        };

        let page = Page::DataPage {
            buf: ByteBufferPtr::new(buf),
            num_values: self.num_buffered_rows,
            encoding,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            statistics,
        };
        self.total_bytes_written += page.buffer().len() as u64;
        self.page_writer.write_page(page)?;

        self.total_rows_written += self.num_buffered_rows as u64;
        self.num_buffered_rows = 0;
        self.def_levels.clear();
        self.rep_levels.clear();
        self.values.clear();
        Ok(())
    }

    fn encode_values(&mut self) -> Result<(Vec<u8>, Encoding)> {
        let plain_size: usize = self.values.iter().map(|v| v.value_size()).sum();
        if self.allow_dict && plain_size > 0 {
            let mut dict: DictEncoder<T> = DictEncoder::new(self.dict_size_limit);
            let fits = dict.put(&self.values).is_ok();
            if fits && dict.estimated_data_encoded_size() < plain_size {
                let dict_page_bytes = dict.write_dictionary_page(self.type_length());
                let dict_page = Page::DictionaryPage {
                    buf: ByteBufferPtr::new(dict_page_bytes),
                    num_values: dict.num_entries() as u32,
                    encoding: Encoding::PLAIN,
                    is_sorted: false,
                };
                self.page_writer.write_page(dict_page)?;
                return Ok((dict.flush_buffer()?, Encoding::RLE_DICTIONARY));
            }
        }
        let mut plain: PlainEncoder<T> = PlainEncoder::new(self.type_length());
        plain.put(&self.values)?;
        Ok((plain.flush_buffer()?, Encoding::PLAIN))
    }

    pub fn close(mut self) -> Result<ColumnCloseResult> {
        self.flush_data_page()?;
        self.page_writer.close()?;
        Ok(ColumnCloseResult { rows_written: self.total_rows_written, bytes_written: self.total_bytes_written })
    }
}

pub struct ColumnCloseResult {
    pub rows_written: u64,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{Repetition, Type};
    use crate::column::page::Page;
    use crate::schema::types::{ColumnDescriptor, ColumnPath, PrimitiveTypeInfo};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct VecPageWriter {
        pages: Rc<RefCell<Vec<Page>>>,
    }

    impl PageWriter for VecPageWriter {
        fn write_page(&mut self, page: Page) -> Result<()> {
            self.pages.borrow_mut().push(page);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn int32_descr(max_def: i16) -> ColumnDescPtr {
        let type_info = PrimitiveTypeInfo::primitive_type_builder("a", Type::INT32)
            .with_repetition(if max_def > 0 { Repetition::OPTIONAL } else { Repetition::REQUIRED })
            .build()
            .unwrap();
        Rc::new(ColumnDescriptor::new(Rc::new(type_info), max_def, 0, ColumnPath::new(vec!["a".to_string()])))
    }

    #[test]
    fn test_write_required_plain_roundtrip() {
        let descr = int32_descr(0);
        let pages = Rc::new(RefCell::new(Vec::new()));
        let writer = VecPageWriter { pages: pages.clone() };
        let mut col: ColumnWriterImpl<Int32Type> = ColumnWriterImpl::new(descr, Box::new(writer));
        let values: Vec<i32> = (0..10).collect();
        col.write_batch(&values, None, None).unwrap();
        let result = col.close().unwrap();
        assert_eq!(result.rows_written, 10);
        assert_eq!(pages.borrow().len(), 1);
    }

    #[test]
    fn test_write_optional_with_nulls() {
        let descr = int32_descr(1);
        let pages = Rc::new(RefCell::new(Vec::new()));
        let writer = VecPageWriter { pages: pages.clone() };
        let mut col: ColumnWriterImpl<Int32Type> = ColumnWriterImpl::new(descr, Box::new(writer));
        let values = [1, 2];
        let defs = [1i16, 0, 1];
        col.write_batch(&values, Some(&defs), None).unwrap();
        let result = col.close().unwrap();
        assert_eq!(result.rows_written, 3);
        match &pages.borrow()[0] {
            Page::DataPage { num_values, .. } => assert_eq!(*num_values, 3),
            _ => panic!("expected a data page"),
        }
    }
}
