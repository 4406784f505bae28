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

//! The byte-source boundary: a random-access reader and a sequential writer.
//! File-backed, object-storage-backed or network-backed implementations are
//! left to the host; this crate only needs the two traits plus an in-memory
//! implementation for its own tests.

use std::io::{self, Cursor, Read, Write};

use crate::errors::Result;

/// Byte-addressable random-access reader.
pub trait ParquetReader: Read {
    /// Returns a fresh cursor over `[start, start+length)` without disturbing
    /// any other reader of the same source.
    fn get_read(&self, start: u64, length: usize) -> Result<Box<dyn Read + '_>>;

    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sequential appender. `close` is separate from `Drop` so a writer can
/// report a flush failure to its caller.
pub trait ParquetWriter: Write {
    fn close(&mut self) -> Result<()>;
}

/// A `ParquetReader` over an owned, immutable byte buffer. Used by this
/// crate's own round-trip tests; a host reading from disk would hand in a
/// `File`-backed implementation instead.
pub struct SliceReader {
    data: std::sync::Arc<Vec<u8>>,
    pos: u64,
}

impl SliceReader {
    pub fn new(data: Vec<u8>) -> Self {
        SliceReader { data: std::sync::Arc::new(data), pos: 0 }
    }
}

impl Read for SliceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.pos as usize;
        if start >= self.data.len() {
            return Ok(0);
        }
        let n = std::cmp::min(buf.len(), self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl ParquetReader for SliceReader {
    fn get_read(&self, start: u64, length: usize) -> Result<Box<dyn Read + '_>> {
        let start = start as usize;
        if start + length > self.data.len() {
            return Err(eof_err!(
                "Requested range [{}, {}) exceeds source length {}",
                start,
                start + length,
                self.data.len()
            ));
        }
        Ok(Box::new(Cursor::new(&self.data[start..start + length])))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A `ParquetWriter` that accumulates into an in-memory `Vec<u8>`, handed
/// back to the caller on `close`.
pub struct VecWriter {
    buf: Vec<u8>,
    closed: bool,
}

impl VecWriter {
    pub fn new() -> Self {
        VecWriter { buf: Vec::new(), closed: false }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for VecWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ParquetWriter for VecWriter {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_reader_read() {
        let mut r = SliceReader::new(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];
        assert_eq!(r.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(r.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(r.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_slice_reader_get_read() {
        let r = SliceReader::new(vec![10, 20, 30, 40, 50]);
        let mut sub = r.get_read(1, 3).unwrap();
        let mut buf = Vec::new();
        sub.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![20, 30, 40]);
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn test_slice_reader_out_of_range() {
        let r = SliceReader::new(vec![1, 2, 3]);
        assert!(r.get_read(2, 5).is_err());
    }

    #[test]
    fn test_vec_writer_roundtrip() {
        let mut w = VecWriter::new();
        w.write_all(b"hello").unwrap();
        w.close().unwrap();
        assert_eq!(w.into_inner(), b"hello".to_vec());
    }
}
