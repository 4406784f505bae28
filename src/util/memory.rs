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

//! Owned byte-buffer types. Pages hold decoded byte buffers with a lifetime
//! bounded by a single iteration step; `ByteBufferPtr` is the
//! cheap, shareable view those buffers are sliced through.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// A reference-counted, immutable byte buffer with O(1) sub-slicing.
/// Cloning is a refcount bump, not a copy — the same backing allocation is
/// shared by a dictionary page's decoded values and every data page that
/// indexes into it.
#[derive(Clone)]
pub struct ByteBufferPtr {
    data: Arc<Vec<u8>>,
    start: usize,
    len: usize,
}

impl ByteBufferPtr {
    pub fn new(v: Vec<u8>) -> Self {
        let len = v.len();
        ByteBufferPtr { data: Arc::new(v), start: 0, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a new pointer covering `[start, start + len)` of this buffer's
    /// *own* addressable range (not the backing allocation's).
    pub fn range(&self, start: usize, len: usize) -> ByteBufferPtr {
        assert!(start + len <= self.len, "range out of bounds");
        ByteBufferPtr { data: self.data.clone(), start: self.start + start, len }
    }

    /// Returns a new pointer starting at `start`, running to the end.
    pub fn start_from(&self, start: usize) -> ByteBufferPtr {
        assert!(start <= self.len, "start out of bounds");
        ByteBufferPtr { data: self.data.clone(), start: self.start + start, len: self.len - start }
    }

    /// Returns the entire addressable range as a fresh pointer (a no-op
    /// slice, useful when a callee wants ownership of the whole view).
    pub fn all(&self) -> ByteBufferPtr {
        self.clone()
    }
}

impl AsRef<[u8]> for ByteBufferPtr {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }
}

impl Index<usize> for ByteBufferPtr {
    type Output = u8;
    fn index(&self, i: usize) -> &u8 {
        &self.data[self.start + i]
    }
}

impl fmt::Debug for ByteBufferPtr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ByteBufferPtr").field("len", &self.len).finish()
    }
}

impl PartialEq for ByteBufferPtr {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

/// Plain growable byte buffer, used where callers need to append rather
/// than just slice (e.g. accumulating a delta codec's mini-block widths).
#[derive(Clone, Default)]
pub struct ByteBuffer {
    buf: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        ByteBuffer { buf: Vec::new() }
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.buf = data;
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn consume(self) -> Vec<u8> {
        self.buf
    }
}
