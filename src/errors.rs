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

//! Error type for this crate. All errors are fatal to the operation in
//! progress: readers stop advancing, writers abort the current row group.
//! There is no silent recovery.

use std::io;

use quick_error::quick_error;

quick_error! {
    /// The single error type produced by this crate.
    ///
    /// Variants map onto distinct failure kinds: malformed wire data
    /// (`Format`), a value routed to the wrong typed
    /// column store (`Type`), an out-of-bounds level/array access (`Range`),
    /// a propagated reader/writer failure (`Io`), and an encoding that a page
    /// presents but the physical type does not support (`NYI`).
    #[derive(Debug)]
    pub enum ParquetError {
        /// Malformed varint, bad block/miniblock parameters, width out of
        /// range, empty hybrid run, wrong page order, bad magic, etc.
        General(message: String) {
            display("Parquet error: {}", message)
        }
        /// A reader ran out of bytes mid-value, mid-run or mid-page. Clean
        /// EOF at a chunk boundary is not represented by this variant.
        Eof(message: String) {
            display("EOF: {}", message)
        }
        /// An encoding or feature this build does not implement was
        /// requested by the data.
        NYI(message: String) {
            display("Not yet implemented: {}", message)
        }
        /// The underlying reader or writer returned an error. The logical
        /// context (offset, column path) is folded into the message since
        /// `io::Error` does not carry it for us.
        Io(message: String) {
            display("IO error: {}", message)
        }
    }
}

impl From<io::Error> for ParquetError {
    fn from(e: io::Error) -> ParquetError {
        ParquetError::Io(format!("{}", e))
    }
}

impl Clone for ParquetError {
    fn clone(&self) -> Self {
        match self {
            ParquetError::General(m) => ParquetError::General(m.clone()),
            ParquetError::Eof(m) => ParquetError::Eof(m.clone()),
            ParquetError::NYI(m) => ParquetError::NYI(m.clone()),
            ParquetError::Io(m) => ParquetError::Io(m.clone()),
        }
    }
}

impl PartialEq for ParquetError {
    fn eq(&self, other: &Self) -> bool {
        format!("{}", self) == format!("{}", other)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, ParquetError>;

/// Attaches offset/column context to a `Result`, per the error-handling
/// design's requirement that I/O errors carry "which offset, which column."
pub trait ResultExt<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| match e {
            ParquetError::Io(m) => ParquetError::Io(format!("{}: {}", what, m)),
            ParquetError::General(m) => ParquetError::General(format!("{}: {}", what, m)),
            ParquetError::Eof(m) => ParquetError::Eof(format!("{}: {}", what, m)),
            ParquetError::NYI(m) => ParquetError::NYI(format!("{}: {}", what, m)),
        })
    }
}

impl std::error::Error for ParquetError {}

#[macro_export]
macro_rules! general_err {
    ($fmt:expr) => (crate::errors::ParquetError::General($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => (
        crate::errors::ParquetError::General(format!($fmt, $($args),*)));
}

#[macro_export]
macro_rules! eof_err {
    ($fmt:expr) => (crate::errors::ParquetError::Eof($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => (
        crate::errors::ParquetError::Eof(format!($fmt, $($args),*)));
}

#[macro_export]
macro_rules! nyi_err {
    ($fmt:expr) => (crate::errors::ParquetError::NYI($fmt.to_string()));
    ($fmt:expr, $($args:expr),*) => (
        crate::errors::ParquetError::NYI(format!($fmt, $($args),*)));
}
