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

//! The footer metadata blob. The real format's wire encoding is an external
//! IDL and out of scope; `FileMetadataCodec` is the seam a host swaps in its
//! own (de)serializer at, and `ReferenceFileMetadataCodec` is this crate's
//! self-contained stand-in, in the same spirit as `ReferencePageHeaderCodec`.

use std::rc::Rc;

use crate::basic::{Compression, LogicalType, Repetition, Type};
use crate::chunk::ColumnChunkMetaData;
use crate::errors::Result;
use crate::schema::types::{ColumnDescPtr, ColumnDescriptor, ColumnPath, PrimitiveTypeInfo};
use crate::util::bit_util::{BitReader, BitWriter};
use crate::util::memory::ByteBufferPtr;

#[derive(Clone, Debug)]
pub struct RowGroupMetaData {
    pub num_rows: i64,
    pub total_byte_size: i64,
    pub columns: Vec<ColumnChunkMetaData>,
}

#[derive(Clone, Debug)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<ColumnDescPtr>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroupMetaData>,
    pub key_value_metadata: Vec<(String, String)>,
}

pub trait FileMetadataCodec {
    fn encode(&self, metadata: &FileMetaData) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> Result<FileMetaData>;
}

fn type_to_u8(t: Type) -> u8 {
    match t {
        Type::BOOLEAN => 0,
        Type::INT32 => 1,
        Type::INT64 => 2,
        Type::INT96 => 3,
        Type::FLOAT => 4,
        Type::DOUBLE => 5,
        Type::BYTE_ARRAY => 6,
        Type::FIXED_LEN_BYTE_ARRAY => 7,
    }
}

fn type_from_u8(v: u8) -> Result<Type> {
    Ok(match v {
        0 => Type::BOOLEAN,
        1 => Type::INT32,
        2 => Type::INT64,
        3 => Type::INT96,
        4 => Type::FLOAT,
        5 => Type::DOUBLE,
        6 => Type::BYTE_ARRAY,
        7 => Type::FIXED_LEN_BYTE_ARRAY,
        other => return Err(general_err!("Unknown physical type tag {}", other)),
    })
}

fn repetition_to_u8(r: Repetition) -> u8 {
    match r {
        Repetition::REQUIRED => 0,
        Repetition::OPTIONAL => 1,
        Repetition::REPEATED => 2,
    }
}

fn repetition_from_u8(v: u8) -> Result<Repetition> {
    Ok(match v {
        0 => Repetition::REQUIRED,
        1 => Repetition::OPTIONAL,
        2 => Repetition::REPEATED,
        other => return Err(general_err!("Unknown repetition tag {}", other)),
    })
}

fn logical_type_to_u8(l: LogicalType) -> u8 {
    match l {
        LogicalType::NONE => 0,
        LogicalType::UTF8 => 1,
        LogicalType::MAP => 2,
        LogicalType::LIST => 3,
        LogicalType::ENUM => 4,
        LogicalType::DECIMAL => 5,
        LogicalType::DATE => 6,
        LogicalType::TIME_MILLIS => 7,
        LogicalType::TIME_MICROS => 8,
        LogicalType::TIMESTAMP_MILLIS => 9,
        LogicalType::TIMESTAMP_MICROS => 10,
        LogicalType::UINT_8 => 11,
        LogicalType::UINT_16 => 12,
        LogicalType::UINT_32 => 13,
        LogicalType::UINT_64 => 14,
        LogicalType::INT_8 => 15,
        LogicalType::INT_16 => 16,
        LogicalType::INT_32 => 17,
        LogicalType::INT_64 => 18,
        LogicalType::JSON => 19,
        LogicalType::BSON => 20,
        LogicalType::INTERVAL => 21,
    }
}

fn logical_type_from_u8(v: u8) -> Result<LogicalType> {
    Ok(match v {
        0 => LogicalType::NONE,
        1 => LogicalType::UTF8,
        2 => LogicalType::MAP,
        3 => LogicalType::LIST,
        4 => LogicalType::ENUM,
        5 => LogicalType::DECIMAL,
        6 => LogicalType::DATE,
        7 => LogicalType::TIME_MILLIS,
        8 => LogicalType::TIME_MICROS,
        9 => LogicalType::TIMESTAMP_MILLIS,
        10 => LogicalType::TIMESTAMP_MICROS,
        11 => LogicalType::UINT_8,
        12 => LogicalType::UINT_16,
        13 => LogicalType::UINT_32,
        14 => LogicalType::UINT_64,
        15 => LogicalType::INT_8,
        16 => LogicalType::INT_16,
        17 => LogicalType::INT_32,
        18 => LogicalType::INT_64,
        19 => LogicalType::JSON,
        20 => LogicalType::BSON,
        21 => LogicalType::INTERVAL,
        other => return Err(general_err!("Unknown logical type tag {}", other)),
    })
}

fn compression_to_u8(c: Compression) -> u8 {
    match c {
        Compression::UNCOMPRESSED => 0,
        Compression::SNAPPY => 1,
        Compression::GZIP => 2,
        Compression::BROTLI => 3,
        Compression::LZ4 => 4,
        Compression::ZSTD => 5,
    }
}

fn compression_from_u8(v: u8) -> Result<Compression> {
    Ok(match v {
        0 => Compression::UNCOMPRESSED,
        1 => Compression::SNAPPY,
        2 => Compression::GZIP,
        3 => Compression::BROTLI,
        4 => Compression::LZ4,
        5 => Compression::ZSTD,
        other => return Err(general_err!("Unknown compression tag {}", other)),
    })
}

fn write_string(w: &mut BitWriter, s: &str) {
    w.put_vlq_int(s.len() as u64);
    w.put_aligned_bytes(s.as_bytes());
}

fn read_string(r: &mut BitReader) -> Result<String> {
    let len = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated string length"))? as usize;
    let bytes = r.get_aligned_bytes(len).ok_or_else(|| eof_err!("Truncated string bytes"))?;
    String::from_utf8(bytes.as_ref().to_vec()).map_err(|e| general_err!("Invalid UTF-8 in metadata string: {}", e))
}

fn write_optional_u64(w: &mut BitWriter, v: Option<u64>) {
    match v {
        Some(x) => {
            w.put_aligned_u64(1, 1);
            w.put_vlq_int(x);
        }
        None => w.put_aligned_u64(0, 1),
    }
}

fn read_optional_u64(r: &mut BitReader) -> Result<Option<u64>> {
    let present = r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated optional offset"))?;
    if present == 0 {
        return Ok(None);
    }
    Ok(Some(r.get_vlq_int().ok_or_else(|| eof_err!("Truncated optional offset"))? as u64))
}

/// Not the real format's Thrift `FileMetaData` — a small varint-framed
/// stand-in used for this crate's own round-trip tests.
pub struct ReferenceFileMetadataCodec;

impl ReferenceFileMetadataCodec {
    fn write_column(w: &mut BitWriter, descr: &ColumnDescriptor) {
        write_string(w, descr.type_info().name());
        w.put_aligned_u64(type_to_u8(descr.physical_type()) as u64, 1);
        w.put_aligned_u64(repetition_to_u8(descr.repetition()) as u64, 1);
        w.put_aligned_u64(logical_type_to_u8(descr.type_info().logical_type()) as u64, 1);
        w.put_zigzag_vlq_int(descr.type_length() as i64);
        w.put_zigzag_vlq_int(descr.type_info().precision() as i64);
        w.put_zigzag_vlq_int(descr.type_info().scale() as i64);
        write_optional_u64(w, descr.type_info().field_id().map(|id| id as u64));
        w.put_vlq_int(descr.max_def_level() as u64);
        w.put_vlq_int(descr.max_rep_level() as u64);
        w.put_vlq_int(descr.path().parts().len() as u64);
        for part in descr.path().parts() {
            write_string(w, part);
        }
    }

    fn read_column(r: &mut BitReader) -> Result<ColumnDescPtr> {
        let name = read_string(r)?;
        let physical_type = type_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated column"))? as u8)?;
        let repetition =
            repetition_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated column"))? as u8)?;
        let logical_type =
            logical_type_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated column"))? as u8)?;
        let length = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as i32;
        let precision = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as i32;
        let scale = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as i32;
        let field_id = read_optional_u64(r)?.map(|id| id as i32);
        let max_def_level = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as i16;
        let max_rep_level = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as i16;
        let num_parts = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated column"))? as usize;
        let mut parts = Vec::with_capacity(num_parts);
        for _ in 0..num_parts {
            parts.push(read_string(r)?);
        }

        let mut builder = PrimitiveTypeInfo::primitive_type_builder(&name, physical_type)
            .with_repetition(repetition)
            .with_logical_type(logical_type)
            .with_length(length)
            .with_precision_scale(precision, scale);
        if let Some(id) = field_id {
            builder = builder.with_field_id(id);
        }
        let type_info = builder.build()?;
        Ok(Rc::new(ColumnDescriptor::new(Rc::new(type_info), max_def_level, max_rep_level, ColumnPath::new(parts))))
    }

    fn write_chunk(w: &mut BitWriter, chunk: &ColumnChunkMetaData) {
        w.put_aligned_u64(compression_to_u8(chunk.compression) as u64, 1);
        w.put_vlq_int(chunk.data_page_offset);
        write_optional_u64(w, chunk.dictionary_page_offset);
        w.put_vlq_int(chunk.total_compressed_size);
    }

    fn read_chunk(r: &mut BitReader) -> Result<ColumnChunkMetaData> {
        let compression =
            compression_from_u8(r.get_aligned_u64(1).ok_or_else(|| eof_err!("Truncated chunk"))? as u8)?;
        let data_page_offset = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated chunk"))? as u64;
        let dictionary_page_offset = read_optional_u64(r)?;
        let total_compressed_size = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated chunk"))? as u64;
        Ok(ColumnChunkMetaData { compression, data_page_offset, dictionary_page_offset, total_compressed_size })
    }
}

impl FileMetadataCodec for ReferenceFileMetadataCodec {
    fn encode(&self, metadata: &FileMetaData) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.put_zigzag_vlq_int(metadata.version as i64);

        w.put_vlq_int(metadata.schema.len() as u64);
        for col in &metadata.schema {
            Self::write_column(&mut w, col);
        }

        w.put_zigzag_vlq_int(metadata.num_rows);

        w.put_vlq_int(metadata.row_groups.len() as u64);
        for rg in &metadata.row_groups {
            w.put_zigzag_vlq_int(rg.num_rows);
            w.put_zigzag_vlq_int(rg.total_byte_size);
            w.put_vlq_int(rg.columns.len() as u64);
            for chunk in &rg.columns {
                Self::write_chunk(&mut w, chunk);
            }
        }

        w.put_vlq_int(metadata.key_value_metadata.len() as u64);
        for (k, v) in &metadata.key_value_metadata {
            write_string(&mut w, k);
            write_string(&mut w, v);
        }

        w.consume()
    }

    fn decode(&self, bytes: &[u8]) -> Result<FileMetaData> {
        let mut r = BitReader::new(ByteBufferPtr::new(bytes.to_vec()));
        let version = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated footer"))? as i32;

        let num_columns = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated footer"))? as usize;
        let mut schema = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            schema.push(Self::read_column(&mut r)?);
        }

        let num_rows = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated footer"))?;

        let num_row_groups = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated footer"))? as usize;
        let mut row_groups = Vec::with_capacity(num_row_groups);
        for _ in 0..num_row_groups {
            let rg_num_rows = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated row group"))?;
            let total_byte_size = r.get_zigzag_vlq_int().ok_or_else(|| eof_err!("Truncated row group"))?;
            let num_chunks = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated row group"))? as usize;
            let mut columns = Vec::with_capacity(num_chunks);
            for _ in 0..num_chunks {
                columns.push(Self::read_chunk(&mut r)?);
            }
            row_groups.push(RowGroupMetaData { num_rows: rg_num_rows, total_byte_size, columns });
        }

        let num_kv = r.get_vlq_int().ok_or_else(|| eof_err!("Truncated footer"))? as usize;
        let mut key_value_metadata = Vec::with_capacity(num_kv);
        for _ in 0..num_kv {
            let k = read_string(&mut r)?;
            let v = read_string(&mut r)?;
            key_value_metadata.push((k, v));
        }

        Ok(FileMetaData { version, schema, num_rows, row_groups, key_value_metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Repetition;

    fn sample_column(name: &str) -> ColumnDescPtr {
        let type_info = PrimitiveTypeInfo::primitive_type_builder(name, Type::INT32)
            .with_repetition(Repetition::OPTIONAL)
            .build()
            .unwrap();
        Rc::new(ColumnDescriptor::new(Rc::new(type_info), 1, 0, ColumnPath::new(vec![name.to_string()])))
    }

    #[test]
    fn test_file_metadata_roundtrip() {
        let schema = vec![sample_column("a"), sample_column("b")];
        let metadata = FileMetaData {
            version: 1,
            schema: schema.clone(),
            num_rows: 100,
            row_groups: vec![RowGroupMetaData {
                num_rows: 100,
                total_byte_size: 512,
                columns: vec![
                    ColumnChunkMetaData {
                        compression: Compression::SNAPPY,
                        data_page_offset: 4,
                        dictionary_page_offset: Some(4),
                        total_compressed_size: 256,
                    },
                    ColumnChunkMetaData {
                        compression: Compression::UNCOMPRESSED,
                        data_page_offset: 260,
                        dictionary_page_offset: None,
                        total_compressed_size: 256,
                    },
                ],
            }],
            key_value_metadata: vec![("created_by".to_string(), "test".to_string())],
        };

        let codec = ReferenceFileMetadataCodec;
        let bytes = codec.encode(&metadata);
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.num_rows, 100);
        assert_eq!(decoded.schema.len(), 2);
        assert_eq!(decoded.schema[0].type_info().name(), "a");
        assert_eq!(decoded.row_groups.len(), 1);
        assert_eq!(decoded.row_groups[0].columns.len(), 2);
        assert_eq!(decoded.row_groups[0].columns[0].dictionary_page_offset, Some(4));
        assert_eq!(decoded.row_groups[0].columns[1].dictionary_page_offset, None);
        assert_eq!(decoded.key_value_metadata, vec![("created_by".to_string(), "test".to_string())]);
    }
}
