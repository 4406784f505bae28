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

//! Column codec and page layer for a self-describing columnar table format.
//!
//! This crate implements the hard engineering underneath a Parquet-shaped
//! file: bit-packing, variable-length integer streams, the hybrid RLE /
//! bit-packed level codec, delta-binary-packing, plain encodings for every
//! physical type, a deduplicating dictionary store, typed column stores that
//! buffer values alongside their repetition/definition levels, and the page
//! reader/writer that frames and (de)compresses page payloads.
//!
//! Out of scope, by design: the footer/page-header wire format (delegated to
//! injected codec traits), the compression algorithms' own implementations
//! (delegated to a codec registry), file-source backends, and the row
//! assembly layer that turns decoded `(value, def_level, rep_level)` triples
//! back into nested records.

#[macro_use]
pub mod errors;

pub mod basic;
pub mod data_type;
pub mod schema;
pub mod util;
pub mod encodings;
pub mod compression;
pub mod source;
pub mod column;
pub mod chunk;
pub mod file;

pub use errors::{ParquetError, Result};
