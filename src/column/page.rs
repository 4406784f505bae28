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

//! The page layer. A page is framed as a header (one of four kinds —
//! dictionary, data v1, data v2, index/stats-passthrough) followed by a
//! payload that, if compressed, must expand to exactly the header's declared
//! uncompressed size.
//!
//! `PageHeaderCodec` is injectable: the real format's page header is a
//! Thrift-encoded struct, which is explicitly out of scope here.
//! `ReferencePageHeaderCodec` is a small self-contained stand-in used by this
//! crate's own tests and by callers who don't need interop with the real
//! wire format.

use crate::basic::{Encoding, PageType};
use crate::errors::Result;
use crate::util::bit_util::{BitReader, BitWriter};
use crate::util::memory::ByteBufferPtr;

#[derive(Clone, Debug, PartialEq)]
pub struct PageStatistics {
    pub min: Option<Vec<u8>>,
    pub max: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
}

#[derive(Clone)]
pub enum Page {
    DictionaryPage { buf: ByteBufferPtr, num_values: u32, encoding: Encoding, is_sorted: bool },
    DataPage {
        buf: ByteBufferPtr,
        num_values: u32,
        encoding: Encoding,
        def_level_encoding: Encoding,
        rep_level_encoding: Encoding,
        statistics: Option<PageStatistics>,
    },
    DataPageV2 {
        buf: ByteBufferPtr,
        num_values: u32,
        num_nulls: u32,
        num_rows: u32,
        encoding: Encoding,
        def_levels_byte_len: u32,
        rep_levels_byte_len: u32,
        is_compressed: bool,
        statistics: Option<PageStatistics>,
    },
    /// Opaque passthrough: carried as raw bytes, never interpreted by the
    /// column codec.
    IndexPage { buf: ByteBufferPtr },
}

impl Page {
    pub fn page_type(&self) -> PageType {
        match self {
            Page::DictionaryPage { .. } => PageType::DICTIONARY_PAGE,
            Page::DataPage { .. } => PageType::DATA_PAGE,
            Page::DataPageV2 { .. } => PageType::DATA_PAGE_V2,
            Page::IndexPage { .. } => PageType::INDEX_PAGE,
        }
    }

    pub fn buffer(&self) -> &ByteBufferPtr {
        match self {
            Page::DictionaryPage { buf, .. }
            | Page::DataPage { buf, .. }
            | Page::DataPageV2 { buf, .. }
            | Page::IndexPage { buf } => buf,
        }
    }

    pub fn num_values(&self) -> u32 {
        match self {
            Page::DictionaryPage { num_values, .. } => *num_values,
            Page::DataPage { num_values, .. } => *num_values,
            Page::DataPageV2 { num_values, .. } => *num_values,
            Page::IndexPage { .. } => 0,
        }
    }
}

/// Declares what a page's payload is and how big it is before and after
/// compression. `compressed_page_size`/`uncompressed_page_size` enforce the
/// compression boundary: after running the chunk's codec, the decompressed
/// byte count must equal `uncompressed_page_size` exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub num_values: u32,
    pub encoding: Encoding,
    pub def_level_encoding: Encoding,
    pub rep_level_encoding: Encoding,
    pub is_dictionary_sorted: bool,
    pub num_nulls: u32,
    pub num_rows: u32,
    pub def_levels_byte_len: u32,
    pub rep_levels_byte_len: u32,
    pub is_compressed: bool,
    pub statistics: Option<PageStatistics>,
}

pub trait PageHeaderCodec {
    fn encode(&self, header: &PageHeader) -> Vec<u8>;
    /// Decodes a header from the front of `bytes`, returning it along with
    /// the number of bytes consumed.
    fn decode(&self, bytes: &ByteBufferPtr) -> Result<(PageHeader, usize)>;
}

fn page_type_to_u8(t: PageType) -> u8 {
    match t {
        PageType::DICTIONARY_PAGE => 0,
        PageType::DATA_PAGE => 1,
        PageType::DATA_PAGE_V2 => 2,
        PageType::INDEX_PAGE => 3,
    }
}

fn page_type_from_u8(v: u8) -> Result<PageType> {
    Ok(match v {
        0 => PageType::DICTIONARY_PAGE,
        1 => PageType::DATA_PAGE,
        2 => PageType::DATA_PAGE_V2,
        3 => PageType::INDEX_PAGE,
        other => return Err(general_err!("Unknown page type tag {}", other)),
    })
}

fn encoding_to_u8(e: Encoding) -> u8 {
    match e {
        Encoding::PLAIN => 0,
        Encoding::PLAIN_DICTIONARY => 1,
        Encoding::RLE => 2,
        Encoding::RLE_DICTIONARY => 3,
        Encoding::DELTA_BINARY_PACKED => 4,
        Encoding::DELTA_LENGTH_BYTE_ARRAY => 5,
        Encoding::DELTA_BYTE_ARRAY => 6,
        Encoding::BIT_PACKED => 7,
    }
}

fn encoding_from_u8(v: u8) -> Result<Encoding> {
    Ok(match v {
        0 => Encoding::PLAIN,
        1 => Encoding::PLAIN_DICTIONARY,
        2 => Encoding::RLE,
        3 => Encoding::RLE_DICTIONARY,
        4 => Encoding::DELTA_BINARY_PACKED,
        5 => Encoding::DELTA_LENGTH_BYTE_ARRAY,
        6 => Encoding::DELTA_BYTE_ARRAY,
        7 => Encoding::BIT_PACKED,
        other => return Err(general_err!("Unknown encoding tag {}", other)),
    })
}

/// Not the real format's Thrift `PageHeader` — a small varint-framed stand-in
/// used for this crate's own round-trip tests (the real footer/header IDL
/// is out of scope here).
pub struct ReferencePageHeaderCodec;

impl ReferencePageHeaderCodec {
    fn write_optional_bytes(writer: &mut BitWriter, value: &Option<Vec<u8>>) {
        match value {
            Some(b) => {
                writer.put_aligned_u64(1, 1);
                writer.put_vlq_int(b.len() as u64);
                writer.put_aligned_bytes(b);
            }
            None => writer.put_aligned_u64(0, 1),
        }
    }

    fn read_optional_bytes(reader: &mut BitReader) -> Result<Option<Vec<u8>>> {
        let present = reader.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated header"))?;
        if present == 0 {
            return Ok(None);
        }
        let len = reader.get_vlq_int().ok_or_else(|| eof_err!("Truncated header"))? as usize;
        let bytes = reader.get_aligned_bytes(len).ok_or_else(|| eof_err!("Truncated header"))?;
        Ok(Some(bytes.as_ref().to_vec()))
    }

    fn write_optional_i64(writer: &mut BitWriter, value: Option<i64>) {
        match value {
            Some(v) => {
                writer.put_aligned_u64(1, 1);
                writer.put_zigzag_vlq_int(v);
            }
            None => writer.put_aligned_u64(0, 1),
        }
    }

    fn read_optional_i64(reader: &mut BitReader) -> Result<Option<i64>> {
        let present = reader.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated header"))?;
        if present == 0 {
            return Ok(None);
        }
        Ok(Some(reader.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated header"))?))
    }
}

impl PageHeaderCodec for ReferencePageHeaderCodec {
    fn encode(&self, header: &PageHeader) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.put_aligned_u64(page_type_to_u8(header.page_type) as u64, 1);
        w.put_zigzag_vlq_int(header.uncompressed_page_size as i64);
        w.put_zigzag_vlq_int(header.compressed_page_size as i64);
        w.put_vlq_int(header.num_values as u64);
        w.put_aligned_u64(encoding_to_u8(header.encoding) as u64, 1);
        w.put_aligned_u64(encoding_to_u8(header.def_level_encoding) as u64, 1);
        w.put_aligned_u64(encoding_to_u8(header.rep_level_encoding) as u64, 1);
        w.put_aligned_u64(header.is_dictionary_sorted as u64, 1);
        w.put_vlq_int(header.num_nulls as u64);
        w.put_vlq_int(header.num_rows as u64);
        w.put_vlq_int(header.def_levels_byte_len as u64);
        w.put_vlq_int(header.rep_levels_byte_len as u64);
        w.put_aligned_u64(header.is_compressed as u64, 1);
        match &header.statistics {
            Some(stats) => {
                w.put_aligned_u64(1, 1);
                Self::write_optional_bytes(&mut w, &stats.min);
                Self::write_optional_bytes(&mut w, &stats.max);
                Self::write_optional_i64(&mut w, stats.null_count);
                Self::write_optional_i64(&mut w, stats.distinct_count);
            }
            None => w.put_aligned_u64(0, 1),
        }
        w.consume()
    }

    fn decode(&self, bytes: &ByteBufferPtr) -> Result<(PageHeader, usize)> {
        let mut r = BitReader::new(bytes.clone());
        let page_type = page_type_from_u8(
            r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? as u8,
        )?;
        let uncompressed_page_size =
            r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as i32;
        let compressed_page_size =
            r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as i32;
        let num_values = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as u32;
        let encoding =
            encoding_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? as u8)?;
        let def_level_encoding =
            encoding_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? as u8)?;
        let rep_level_encoding =
            encoding_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? as u8)?;
        let is_dictionary_sorted =
            r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? != 0;
        let num_nulls = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as u32;
        let num_rows = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as u32;
        let def_levels_byte_len =
            r.get_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as u32;
        let rep_levels_byte_len =
            r.get_vlq_int().ok_or_else(|| eof_err!("Truncated page header"))? as u32;
        let is_compressed = r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))? != 0;
        let has_stats = r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated page header"))?;
        let statistics = if has_stats != 0 {
            let min = Self::read_optional_bytes(&mut r)?;
            let max = Self::read_optional_bytes(&mut r)?;
            let null_count = Self::read_optional_i64(&mut r)?;
            let distinct_count = Self::read_optional_i64(&mut r)?;
            Some(PageStatistics { min, max, null_count, distinct_count })
        } else {
            None
        };
        let consumed = r.get_byte_offset();
        Ok((
            PageHeader {
                page_type,
                uncompressed_page_size,
                compressed_page_size,
                num_values,
                encoding,
                def_level_encoding,
                rep_level_encoding,
                is_dictionary_sorted,
                num_nulls,
                num_rows,
                def_levels_byte_len,
                rep_levels_byte_len,
                is_compressed,
                statistics,
            },
            consumed,
        ))
    }
}

pub trait PageReader {
    /// Returns the next page, or `None` at a clean end of the chunk.
    fn get_next_page(&mut self) -> Result<Option<Page>>;
}

pub trait PageWriter {
    fn write_page(&mut self, page: Page) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_header_roundtrip() {
        let header = PageHeader {
            page_type: PageType::DATA_PAGE,
            uncompressed_page_size: 100,
            compressed_page_size: 80,
            num_values: 50,
            encoding: Encoding::RLE_DICTIONARY,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            is_dictionary_sorted: false,
            num_nulls: 2,
            num_rows: 50,
            def_levels_byte_len: 0,
            rep_levels_byte_len: 0,
            is_compressed: true,
            statistics: Some(PageStatistics {
                min: Some(vec![1, 2, 3]),
                max: Some(vec![9, 9, 9]),
                null_count: Some(2),
                distinct_count: None,
            }),
        };
        let codec = ReferencePageHeaderCodec;
        let bytes = codec.encode(&header);
        let (decoded, consumed) = codec.decode(&ByteBufferPtr::new(bytes.clone())).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_page_header_no_statistics() {
        let header = PageHeader {
            page_type: PageType::DICTIONARY_PAGE,
            uncompressed_page_size: 40,
            compressed_page_size: 40,
            num_values: 10,
            encoding: Encoding::PLAIN,
            def_level_encoding: Encoding::RLE,
            rep_level_encoding: Encoding::RLE,
            is_dictionary_sorted: false,
            num_nulls: 0,
            num_rows: 0,
            def_levels_byte_len: 0,
            rep_levels_byte_len: 0,
            is_compressed: false,
            statistics: None,
        };
        let codec = ReferencePageHeaderCodec;
        let bytes = codec.encode(&header);
        let (decoded, _) = codec.decode(&ByteBufferPtr::new(bytes)).unwrap();
        assert_eq!(decoded, header);
    }
}
