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

//! File-level writer operations. `open` writes the leading magic; each row
//! group's columns are flushed through the chunk layer; `close` writes the
//! footer and the trailing magic.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::basic::Compression;
use crate::chunk::{ColumnChunkMetaData, SerializedPageWriter};
use crate::column::page::ReferencePageHeaderCodec;
use crate::column::writer::ColumnWriterImpl;
use crate::data_type::DataType;
use crate::errors::Result;
use crate::file::metadata::{FileMetaData, FileMetadataCodec, RowGroupMetaData};
use crate::schema::types::ColumnDescPtr;
use crate::source::ParquetWriter;

use super::PARQUET_MAGIC;

pub struct SerializedFileWriter<W: ParquetWriter> {
    sink: W,
    schema: Vec<ColumnDescPtr>,
    compression: Compression,
    metadata_codec: Box<dyn FileMetadataCodec>,
    row_groups: Vec<RowGroupMetaData>,
    total_rows: i64,
    offset: u64,
    key_value_metadata: Vec<(String, String)>,
}

impl<W: ParquetWriter> SerializedFileWriter<W> {
    pub fn new(
        mut sink: W,
        schema: Vec<ColumnDescPtr>,
        compression: Compression,
        metadata_codec: Box<dyn FileMetadataCodec>,
    ) -> Result<Self> {
        sink.write_all(PARQUET_MAGIC)?;
        Ok(SerializedFileWriter {
            sink,
            schema,
            compression,
            metadata_codec,
            row_groups: Vec::new(),
            total_rows: 0,
            offset: PARQUET_MAGIC.len() as u64,
            key_value_metadata: Vec::new(),
        })
    }

    pub fn set_key_value_metadata(&mut self, kv: Vec<(String, String)>) {
        self.key_value_metadata = kv;
    }

    pub fn next_row_group(&mut self) -> RowGroupWriter<'_, W> {
        RowGroupWriter {
            sink: &mut self.sink,
            compression: self.compression,
            offset: &mut self.offset,
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    pub fn append_row_group(&mut self, row_group: RowGroupMetaData) {
        self.total_rows += row_group.num_rows;
        self.row_groups.push(row_group);
    }

    /// Writes the footer metadata, its length, and the trailing magic, then
    /// returns the underlying sink (already `close`d) for the host to do
    /// with as it sees fit.
    pub fn close(mut self) -> Result<W> {
        let metadata = FileMetaData {
            version: 1,
            schema: self.schema,
            num_rows: self.total_rows,
            row_groups: self.row_groups,
            key_value_metadata: self.key_value_metadata,
        };
        let footer_bytes = self.metadata_codec.encode(&metadata);
        self.sink.write_all(&footer_bytes)?;
        self.sink.write_u32::<LittleEndian>(footer_bytes.len() as u32)?;
        self.sink.write_all(PARQUET_MAGIC)?;
        self.sink.close()?;
        Ok(self.sink)
    }
}

/// Buffers the column chunks of one row group; `write_column` flushes each
/// column immediately (one data page per column, matching the no-dict-mode
/// decision at flush time that `ColumnWriterImpl` already commits to).
pub struct RowGroupWriter<'a, W: ParquetWriter> {
    sink: &'a mut W,
    compression: Compression,
    offset: &'a mut u64,
    columns: Vec<ColumnChunkMetaData>,
    num_rows: i64,
}

impl<'a, W: ParquetWriter> RowGroupWriter<'a, W> {
    pub fn write_column<T: DataType>(
        &mut self,
        descr: ColumnDescPtr,
        values: &[T::T],
        def_levels: Option<&[i16]>,
        rep_levels: Option<&[i16]>,
    ) -> Result<()> {
        let chunk_start = *self.offset;
        let page_writer =
            SerializedPageWriter::new(&mut *self.sink, self.compression, Box::new(ReferencePageHeaderCodec));
        let dictionary_seen = page_writer.dictionary_seen_handle();
        let chunk_bytes_written = page_writer.bytes_written_handle();

        let mut column_writer: ColumnWriterImpl<T> = ColumnWriterImpl::new(descr, Box::new(page_writer));
        column_writer.write_batch(values, def_levels, rep_levels)?;
        let close_result = column_writer.close()?;
        let chunk_size = chunk_bytes_written.get();

        let chunk = ColumnChunkMetaData {
            compression: self.compression,
            data_page_offset: chunk_start,
            dictionary_page_offset: if dictionary_seen.get() { Some(chunk_start) } else { None },
            total_compressed_size: chunk_size,
        };
        *self.offset += chunk_size;
        self.num_rows += close_result.rows_written as i64;
        self.columns.push(chunk);
        Ok(())
    }

    pub fn close(self) -> RowGroupMetaData {
        let total_byte_size = self.columns.iter().map(|c| c.total_compressed_size as i64).sum();
        RowGroupMetaData { num_rows: self.num_rows, total_byte_size, columns: self.columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{Repetition, Type};
    use crate::data_type::Int32Type;
    use crate::file::metadata::ReferenceFileMetadataCodec;
    use crate::file::reader::SerializedFileReader;
    use crate::schema::types::{ColumnDescriptor, ColumnPath, PrimitiveTypeInfo};
    use crate::source::{SliceReader, VecWriter};
    use std::rc::Rc;

    fn int32_descr() -> ColumnDescPtr {
        let type_info =
            PrimitiveTypeInfo::primitive_type_builder("a", Type::INT32).with_repetition(Repetition::REQUIRED).build().unwrap();
        Rc::new(ColumnDescriptor::new(Rc::new(type_info), 0, 0, ColumnPath::new(vec!["a".to_string()])))
    }

    #[test]
    fn test_file_roundtrip_single_column() {
        let schema = vec![int32_descr()];
        let sink = VecWriter::new();
        let mut writer =
            SerializedFileWriter::new(sink, schema.clone(), Compression::UNCOMPRESSED, Box::new(ReferenceFileMetadataCodec))
                .unwrap();

        {
            let mut rg = writer.next_row_group();
            let values: Vec<i32> = (0..20).collect();
            rg.write_column::<Int32Type>(schema[0].clone(), &values, None, None).unwrap();
            let rg_meta = rg.close();
            writer.append_row_group(rg_meta);
        }

        let sink = writer.close().unwrap();
        let bytes = sink.into_inner();

        let source = SliceReader::new(bytes);
        let reader = SerializedFileReader::new(source, Box::new(ReferenceFileMetadataCodec)).unwrap();
        assert_eq!(reader.num_rows(), 20);
        assert_eq!(reader.row_group_count(), 1);
    }
}
