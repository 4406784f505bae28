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

//! The chunk reader/writer. Frames pages on top of a byte
//! source, handing decoded `Page`s to the column reader and accepting
//! encoded `Page`s from the column writer. One dictionary page, then one or
//! more data pages, in that order: `INIT -> (DICTIONARY?) -> DATA+ -> END`.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::basic::{Compression, PageType};
use crate::column::page::{Page, PageHeader, PageHeaderCodec, PageReader, PageWriter};
use crate::compression::create_codec;
use crate::errors::Result;
use crate::source::{ParquetReader, ParquetWriter};
use crate::util::memory::ByteBufferPtr;

/// Where a column chunk lives in the file and how its payload is framed.
#[derive(Clone, Debug)]
pub struct ColumnChunkMetaData {
    pub compression: Compression,
    pub data_page_offset: u64,
    pub dictionary_page_offset: Option<u64>,
    pub total_compressed_size: u64,
}

/// Reads one column chunk's pages in order, decompressing each payload and
/// handing back a fully decoded `Page` (levels and values both in plain
/// bytes; DataPageV2's levels were never compressed to begin with).
pub struct SerializedPageReader<'a, R: ParquetReader> {
    reader: &'a R,
    header_codec: Box<dyn PageHeaderCodec>,
    compression: Compression,
    cursor: u64,
    end: u64,
    seen_dictionary: bool,
    seen_data: bool,
}

impl<'a, R: ParquetReader> SerializedPageReader<'a, R> {
    pub fn new(
        reader: &'a R,
        metadata: &ColumnChunkMetaData,
        header_codec: Box<dyn PageHeaderCodec>,
    ) -> Self {
        let start = metadata.dictionary_page_offset.unwrap_or(metadata.data_page_offset);
        SerializedPageReader {
            reader,
            header_codec,
            compression: metadata.compression,
            cursor: start,
            end: start + metadata.total_compressed_size,
            seen_dictionary: false,
            seen_data: false,
        }
    }

    fn read_exact_at(&mut self, len: usize) -> Result<ByteBufferPtr> {
        let mut sub = self.reader.get_read(self.cursor, len)?;
        let mut buf = vec![0u8; len];
        sub.read_exact(&mut buf).map_err(|e| {
            eof_err!("Truncated page frame at offset {}: {}", self.cursor, e)
        })?;
        self.cursor += len as u64;
        Ok(ByteBufferPtr::new(buf))
    }

    fn decompress(&self, payload: &ByteBufferPtr, uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut codec = create_codec(self.compression)?;
        codec.decompress(payload.as_ref(), uncompressed_size)
    }
}

impl<'a, R: ParquetReader> PageReader for SerializedPageReader<'a, R> {
    fn get_next_page(&mut self) -> Result<Option<Page>> {
        if self.cursor >= self.end {
            return Ok(None);
        }

        let header_len_bytes = self.read_exact_at(4)?;
        let mut cursor = header_len_bytes.as_ref();
        let header_len = cursor.read_u32::<LittleEndian>()? as usize;

        let header_bytes = self.read_exact_at(header_len)?;
        let (header, _) = self.header_codec.decode(&header_bytes)?;

        if header.uncompressed_page_size < 0 || header.compressed_page_size < 0 {
            return Err(general_err!(
                "Negative page size in header (uncompressed={}, compressed={})",
                header.uncompressed_page_size,
                header.compressed_page_size
            ));
        }

        match header.page_type {
            PageType::DICTIONARY_PAGE => {
                if self.seen_dictionary || self.seen_data {
                    return Err(general_err!(
                        "Column chunk cannot have more than one dictionary page, and it must be first"
                    ));
                }
                self.seen_dictionary = true;
            }
            _ => self.seen_data = true,
        }

        let page = match header.page_type {
            PageType::DICTIONARY_PAGE => {
                let payload = self.read_exact_at(header.compressed_page_size as usize)?;
                let bytes = self.decompress(&payload, header.uncompressed_page_size as usize)?;
                Page::DictionaryPage {
                    buf: ByteBufferPtr::new(bytes),
                    num_values: header.num_values,
                    encoding: header.encoding,
                    is_sorted: header.is_dictionary_sorted,
                }
            }
            PageType::DATA_PAGE => {
                let payload = self.read_exact_at(header.compressed_page_size as usize)?;
                let bytes = self.decompress(&payload, header.uncompressed_page_size as usize)?;
                Page::DataPage {
                    buf: ByteBufferPtr::new(bytes),
                    num_values: header.num_values,
                    encoding: header.encoding,
                    def_level_encoding: header.def_level_encoding,
                    rep_level_encoding: header.rep_level_encoding,
                    statistics: header.statistics,
                }
            }
            PageType::DATA_PAGE_V2 => {
                let levels_len = (header.rep_levels_byte_len + header.def_levels_byte_len) as usize;
                let total_len = header.compressed_page_size as usize;
                if levels_len > total_len {
                    return Err(general_err!(
                        "DataPageV2 level byte lengths ({}) exceed the page's compressed size ({})",
                        levels_len,
                        total_len
                    ));
                }
                let frame = self.read_exact_at(total_len)?;
                let level_bytes = frame.range(0, levels_len);
                let value_payload = frame.start_from(levels_len);

                let values_uncompressed_size = header.uncompressed_page_size as usize - levels_len;
                let value_bytes = if header.is_compressed {
                    self.decompress(&value_payload, values_uncompressed_size)?
                } else {
                    value_payload.as_ref().to_vec()
                };

                let mut buf = Vec::with_capacity(levels_len + value_bytes.len());
                buf.extend_from_slice(level_bytes.as_ref());
                buf.extend_from_slice(&value_bytes);

                Page::DataPageV2 {
                    buf: ByteBufferPtr::new(buf),
                    num_values: header.num_values,
                    num_nulls: header.num_nulls,
                    num_rows: header.num_rows,
                    encoding: header.encoding,
                    def_levels_byte_len: header.def_levels_byte_len,
                    rep_levels_byte_len: header.rep_levels_byte_len,
                    is_compressed: header.is_compressed,
                    statistics: header.statistics,
                }
            }
            PageType::INDEX_PAGE => {
                let payload = self.read_exact_at(header.compressed_page_size as usize)?;
                Page::IndexPage { buf: payload }
            }
        };

        Ok(Some(page))
    }
}

/// Writes one column chunk's pages in order: length-prefixed header, then
/// the (optionally compressed) payload.
pub struct SerializedPageWriter<'a, W: ParquetWriter> {
    sink: &'a mut W,
    header_codec: Box<dyn PageHeaderCodec>,
    compression: Compression,
    bytes_written: u64,
    dictionary_seen: std::rc::Rc<std::cell::Cell<bool>>,
    bytes_written_handle: std::rc::Rc<std::cell::Cell<u64>>,
}

impl<'a, W: ParquetWriter> SerializedPageWriter<'a, W> {
    pub fn new(sink: &'a mut W, compression: Compression, header_codec: Box<dyn PageHeaderCodec>) -> Self {
        SerializedPageWriter {
            sink,
            header_codec,
            compression,
            bytes_written: 0,
            dictionary_seen: std::rc::Rc::new(std::cell::Cell::new(false)),
            bytes_written_handle: std::rc::Rc::new(std::cell::Cell::new(0)),
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// A handle the caller can read after this writer has been boxed and
    /// consumed by a column writer, to learn whether a dictionary page was
    /// ever written to this chunk.
    pub fn dictionary_seen_handle(&self) -> std::rc::Rc<std::cell::Cell<bool>> {
        self.dictionary_seen.clone()
    }

    /// A handle mirroring `bytes_written`, readable after this writer has
    /// been boxed and consumed, so a caller can learn the chunk's on-disk
    /// size (header framing plus compressed payload, across every page
    /// including the dictionary page) once the column writer has closed.
    pub fn bytes_written_handle(&self) -> std::rc::Rc<std::cell::Cell<u64>> {
        self.bytes_written_handle.clone()
    }

    fn write_framed(&mut self, header: &PageHeader, payload: &[u8]) -> Result<()> {
        let header_bytes = self.header_codec.encode(header);
        self.sink.write_u32::<LittleEndian>(header_bytes.len() as u32)?;
        self.sink.write_all(&header_bytes)?;
        self.sink.write_all(payload)?;
        self.bytes_written += 4 + header_bytes.len() as u64 + payload.len() as u64;
        self.bytes_written_handle.set(self.bytes_written);
        Ok(())
    }
}

impl<'a, W: ParquetWriter> PageWriter for SerializedPageWriter<'a, W> {
    fn write_page(&mut self, page: Page) -> Result<()> {
        let mut codec = create_codec(self.compression)?;
        match page {
            Page::DictionaryPage { buf, num_values, encoding, is_sorted } => {
                self.dictionary_seen.set(true);
                let compressed = codec.compress(buf.as_ref())?;
                let header = PageHeader {
                    page_type: PageType::DICTIONARY_PAGE,
                    uncompressed_page_size: buf.len() as i32,
                    compressed_page_size: compressed.len() as i32,
                    num_values,
                    encoding,
                    def_level_encoding: crate::basic::Encoding::RLE,
                    rep_level_encoding: crate::basic::Encoding::RLE,
                    is_dictionary_sorted: is_sorted,
                    num_nulls: 0,
                    num_rows: 0,
                    def_levels_byte_len: 0,
                    rep_levels_byte_len: 0,
                    is_compressed: self.compression != Compression::UNCOMPRESSED,
                    statistics: None,
                };
                self.write_framed(&header, &compressed)
            }
            Page::DataPage { buf, num_values, encoding, def_level_encoding, rep_level_encoding, statistics } => {
                let compressed = codec.compress(buf.as_ref())?;
                let header = PageHeader {
                    page_type: PageType::DATA_PAGE,
                    uncompressed_page_size: buf.len() as i32,
                    compressed_page_size: compressed.len() as i32,
                    num_values,
                    encoding,
                    def_level_encoding,
                    rep_level_encoding,
                    is_dictionary_sorted: false,
                    num_nulls: 0,
                    num_rows: 0,
                    def_levels_byte_len: 0,
                    rep_levels_byte_len: 0,
                    is_compressed: self.compression != Compression::UNCOMPRESSED,
                    statistics,
                };
                self.write_framed(&header, &compressed)
            }
            Page::DataPageV2 {
                buf,
                num_values,
                num_nulls,
                num_rows,
                encoding,
                def_levels_byte_len,
                rep_levels_byte_len,
                statistics,
                ..
            } => {
                let levels_len = (def_levels_byte_len + rep_levels_byte_len) as usize;
                let level_bytes = buf.range(0, levels_len);
                let value_bytes = buf.start_from(levels_len);
                let compressed_values = codec.compress(value_bytes.as_ref())?;
                let mut payload = Vec::with_capacity(levels_len + compressed_values.len());
                payload.extend_from_slice(level_bytes.as_ref());
                payload.extend_from_slice(&compressed_values);

                let header = PageHeader {
                    page_type: PageType::DATA_PAGE_V2,
                    uncompressed_page_size: buf.len() as i32,
                    compressed_page_size: payload.len() as i32,
                    num_values,
                    encoding,
                    def_level_encoding: crate::basic::Encoding::RLE,
                    rep_level_encoding: crate::basic::Encoding::RLE,
                    is_dictionary_sorted: false,
                    num_nulls,
                    num_rows,
                    def_levels_byte_len,
                    rep_levels_byte_len,
                    is_compressed: self.compression != Compression::UNCOMPRESSED,
                    statistics,
                };
                self.write_framed(&header, &payload)
            }
            Page::IndexPage { buf } => {
                let header = PageHeader {
                    page_type: PageType::INDEX_PAGE,
                    uncompressed_page_size: buf.len() as i32,
                    compressed_page_size: buf.len() as i32,
                    num_values: 0,
                    encoding: crate::basic::Encoding::PLAIN,
                    def_level_encoding: crate::basic::Encoding::RLE,
                    rep_level_encoding: crate::basic::Encoding::RLE,
                    is_dictionary_sorted: false,
                    num_nulls: 0,
                    num_rows: 0,
                    def_levels_byte_len: 0,
                    rep_levels_byte_len: 0,
                    is_compressed: false,
                    statistics: None,
                };
                self.write_framed(&header, buf.as_ref())
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Encoding;
    use crate::column::page::ReferencePageHeaderCodec;
    use crate::source::{SliceReader, VecWriter};

    #[test]
    fn test_page_roundtrip_data_page() {
        let mut sink = VecWriter::new();
        {
            let mut writer = SerializedPageWriter::new(&mut sink, Compression::UNCOMPRESSED, Box::new(ReferencePageHeaderCodec));
            writer
                .write_page(Page::DataPage {
                    buf: ByteBufferPtr::new(vec![1, 2, 3, 4, 5]),
                    num_values: 5,
                    encoding: Encoding::PLAIN,
                    def_level_encoding: Encoding::RLE,
                    rep_level_encoding: Encoding::RLE,
                    statistics: None,
                })
                .unwrap();
        }
        let bytes = sink.into_inner();
        let reader = SliceReader::new(bytes.clone());
        let metadata = ColumnChunkMetaData {
            compression: Compression::UNCOMPRESSED,
            data_page_offset: 0,
            dictionary_page_offset: None,
            total_compressed_size: bytes.len() as u64,
        };
        let mut page_reader = SerializedPageReader::new(&reader, &metadata, Box::new(ReferencePageHeaderCodec));
        let page = page_reader.get_next_page().unwrap().unwrap();
        match page {
            Page::DataPage { buf, num_values, .. } => {
                assert_eq!(num_values, 5);
                assert_eq!(buf.as_ref(), &[1, 2, 3, 4, 5]);
            }
            _ => panic!("expected a data page"),
        }
        assert!(page_reader.get_next_page().unwrap().is_none());
    }

    #[test]
    fn test_dictionary_then_data_page() {
        let mut sink = VecWriter::new();
        {
            let mut writer = SerializedPageWriter::new(&mut sink, Compression::SNAPPY, Box::new(ReferencePageHeaderCodec));
            writer
                .write_page(Page::DictionaryPage {
                    buf: ByteBufferPtr::new(vec![9, 9, 9]),
                    num_values: 3,
                    encoding: Encoding::PLAIN,
                    is_sorted: false,
                })
                .unwrap();
            writer
                .write_page(Page::DataPage {
                    buf: ByteBufferPtr::new(vec![1, 2, 3]),
                    num_values: 3,
                    encoding: Encoding::RLE_DICTIONARY,
                    def_level_encoding: Encoding::RLE,
                    rep_level_encoding: Encoding::RLE,
                    statistics: None,
                })
                .unwrap();
        }
        let bytes = sink.into_inner();
        let reader = SliceReader::new(bytes.clone());
        let metadata = ColumnChunkMetaData {
            compression: Compression::SNAPPY,
            data_page_offset: 0,
            dictionary_page_offset: Some(0),
            total_compressed_size: bytes.len() as u64,
        };
        let mut page_reader = SerializedPageReader::new(&reader, &metadata, Box::new(ReferencePageHeaderCodec));
        assert!(matches!(page_reader.get_next_page().unwrap(), Some(Page::DictionaryPage { .. })));
        assert!(matches!(page_reader.get_next_page().unwrap(), Some(Page::DataPage { .. })));
        assert!(page_reader.get_next_page().unwrap().is_none());
    }

    #[test]
    fn test_second_dictionary_page_is_fatal() {
        let mut sink = VecWriter::new();
        {
            let mut writer = SerializedPageWriter::new(&mut sink, Compression::UNCOMPRESSED, Box::new(ReferencePageHeaderCodec));
            let dict_page = || Page::DictionaryPage {
                buf: ByteBufferPtr::new(vec![1, 2, 3]),
                num_values: 3,
                encoding: Encoding::PLAIN,
                is_sorted: false,
            };
            writer.write_page(dict_page()).unwrap();
            writer.write_page(dict_page()).unwrap();
        }
        let bytes = sink.into_inner();
        let reader = SliceReader::new(bytes.clone());
        let metadata = ColumnChunkMetaData {
            compression: Compression::UNCOMPRESSED,
            data_page_offset: 0,
            dictionary_page_offset: Some(0),
            total_compressed_size: bytes.len() as u64,
        };
        let mut page_reader = SerializedPageReader::new(&reader, &metadata, Box::new(ReferencePageHeaderCodec));
        assert!(page_reader.get_next_page().unwrap().is_some());
        assert!(page_reader.get_next_page().is_err());
    }
}
