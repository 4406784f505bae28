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

//! File-level framing: magic bytes, footer length, and the footer metadata
//! codec boundary, built atop the chunk and column layers.

pub mod metadata;
pub mod reader;
pub mod writer;

pub(crate) const PARQUET_MAGIC: &[u8] = b"PAR1";

pub use metadata::{FileMetaData, FileMetadataCodec, ReferenceFileMetadataCodec, RowGroupMetaData};
pub use reader::SerializedFileReader;
pub use writer::SerializedFileWriter;
