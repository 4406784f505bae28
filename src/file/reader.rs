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

//! File-level reader operations. `open` validates both magic bytes, reads
//! the footer length and metadata blob, and leaves column-level access to
//! `get_column_reader`. Materializing nested records from decoded
//! `(value, d, r)` triples is the row-assembly layer and stays out of scope.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::chunk::SerializedPageReader;
use crate::column::page::ReferencePageHeaderCodec;
use crate::column::reader::ColumnReaderImpl;
use crate::data_type::DataType;
use crate::errors::Result;
use crate::file::metadata::{FileMetaData, FileMetadataCodec};
use crate::source::ParquetReader;

use super::PARQUET_MAGIC;

pub struct SerializedFileReader<R: ParquetReader> {
    source: R,
    metadata: FileMetaData,
}

impl<R: ParquetReader> SerializedFileReader<R> {
    pub fn new(source: R, metadata_codec: Box<dyn FileMetadataCodec>) -> Result<Self> {
        let len = source.len();
        let magic_len = PARQUET_MAGIC.len() as u64;
        if len < 2 * magic_len + 4 {
            return Err(general_err!("File of {} bytes is too short to hold magic and footer length", len));
        }

        let mut head_buf = vec![0u8; PARQUET_MAGIC.len()];
        source.get_read(0, PARQUET_MAGIC.len())?.read_exact(&mut head_buf)?;
        if head_buf != PARQUET_MAGIC {
            return Err(general_err!("Invalid leading magic bytes: {:?}", head_buf));
        }

        let trailing_start = len - magic_len;
        let mut tail_buf = vec![0u8; PARQUET_MAGIC.len()];
        source.get_read(trailing_start, PARQUET_MAGIC.len())?.read_exact(&mut tail_buf)?;
        if tail_buf != PARQUET_MAGIC {
            return Err(general_err!("Invalid trailing magic bytes: {:?}", tail_buf));
        }

        let footer_len_start = trailing_start - 4;
        let footer_len = source.get_read(footer_len_start, 4)?.read_u32::<LittleEndian>()? as u64;

        if footer_len > footer_len_start {
            return Err(general_err!(
                "Footer length {} exceeds the {} bytes available before it",
                footer_len,
                footer_len_start
            ));
        }
        let footer_start = footer_len_start - footer_len;
        let mut footer_buf = vec![0u8; footer_len as usize];
        source.get_read(footer_start, footer_len as usize)?.read_exact(&mut footer_buf)?;

        let metadata = metadata_codec.decode(&footer_buf)?;
        Ok(SerializedFileReader { source, metadata })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn row_group_count(&self) -> usize {
        self.metadata.row_groups.len()
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn metadata_kv(&self) -> &[(String, String)] {
        &self.metadata.key_value_metadata
    }

    /// A typed reader positioned at one column chunk of one row group. The
    /// host picks `T` to match the schema's declared physical type for
    /// `column_idx` (mismatches surface as decode errors, not panics).
    pub fn get_column_reader<T: DataType>(
        &self,
        row_group_idx: usize,
        column_idx: usize,
    ) -> Result<ColumnReaderImpl<'_, T>> {
        let row_group = self
            .metadata
            .row_groups
            .get(row_group_idx)
            .ok_or_else(|| general_err!("Row group index {} out of range", row_group_idx))?;
        let chunk = row_group
            .columns
            .get(column_idx)
            .ok_or_else(|| general_err!("Column index {} out of range in row group {}", column_idx, row_group_idx))?;
        let descr = self
            .metadata
            .schema
            .get(column_idx)
            .ok_or_else(|| general_err!("Column index {} out of range in schema", column_idx))?
            .clone();

        let page_reader = SerializedPageReader::new(&self.source, chunk, Box::new(ReferencePageHeaderCodec));
        Ok(ColumnReaderImpl::new(descr, Box::new(page_reader)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Compression;
    use crate::data_type::Int32Type;
    use crate::file::metadata::ReferenceFileMetadataCodec;
    use crate::file::writer::SerializedFileWriter;
    use crate::schema::types::{ColumnDescriptor, ColumnPath, PrimitiveTypeInfo};
    use crate::basic::{Repetition, Type};
    use crate::source::{SliceReader, VecWriter};
    use std::rc::Rc;

    #[test]
    fn test_bad_magic_is_rejected() {
        let bytes = vec![0u8; 16];
        let source = SliceReader::new(bytes);
        assert!(SerializedFileReader::new(source, Box::new(ReferenceFileMetadataCodec)).is_err());
    }

    #[test]
    fn test_reads_back_written_column() {
        let type_info =
            PrimitiveTypeInfo::primitive_type_builder("a", Type::INT32).with_repetition(Repetition::REQUIRED).build().unwrap();
        let descr = Rc::new(ColumnDescriptor::new(Rc::new(type_info), 0, 0, ColumnPath::new(vec!["a".to_string()])));
        let schema = vec![descr.clone()];

        let sink = VecWriter::new();
        let mut writer =
            SerializedFileWriter::new(sink, schema.clone(), Compression::UNCOMPRESSED, Box::new(ReferenceFileMetadataCodec))
                .unwrap();
        let values: Vec<i32> = (0..8).collect();
        {
            let mut rg = writer.next_row_group();
            rg.write_column::<Int32Type>(descr, &values, None, None).unwrap();
            let rg_meta = rg.close();
            writer.append_row_group(rg_meta);
        }
        let sink = writer.close().unwrap();
        let bytes = sink.into_inner();

        let source = SliceReader::new(bytes);
        let reader = SerializedFileReader::new(source, Box::new(ReferenceFileMetadataCodec)).unwrap();
        assert_eq!(reader.num_rows(), 8);

        let mut col_reader = reader.get_column_reader::<Int32Type>(0, 0).unwrap();
        let mut out = vec![0i32; 8];
        let (num_read, _) = col_reader.read_batch(8, None, None, &mut out).unwrap();
        assert_eq!(num_read, 8);
        assert_eq!(out, values);
    }
}
