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

//! The write-side dictionary store. Deduplicates values as they're appended,
//! keyed by an FNV-1a hash of their statistics-byte form, with a same-bucket
//! equality check to resolve collisions.
//! Distinct from `encodings::encoding::DictEncoder`, which only knows how to
//! turn already-resolved indices into wire bytes; this is the part that
//! decides what index a value gets.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::data_type::DataType;
use crate::util::hash_util::fnv_hash_64;

pub struct ColumnDictionary<T: DataType> {
    values: Vec<T::T>,
    hash_to_indices: HashMap<u64, Vec<u32>>,
    size_used: usize,
    size_limit: usize,
    null_count: usize,
    disabled: bool,
    _marker: PhantomData<T>,
}

impl<T: DataType> ColumnDictionary<T> {
    pub fn new(size_limit: usize) -> Self {
        ColumnDictionary {
            values: Vec::new(),
            hash_to_indices: HashMap::new(),
            size_used: 0,
            size_limit,
            null_count: 0,
            disabled: false,
            _marker: PhantomData,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn num_entries(&self) -> usize {
        self.values.len()
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn record_null(&mut self) {
        self.null_count += 1;
    }

    pub fn values(&self) -> &[T::T] {
        &self.values
    }

    /// Interns `value`, returning its dictionary index. Returns `None` (and
    /// permanently disables the dictionary) once doing so would exceed
    /// `size_limit` — the caller must then fall back to plain encoding.
    pub fn get_or_insert(&mut self, value: &T::T) -> Option<u32> {
        if self.disabled {
            return None;
        }
        let hash = fnv_hash_64(&value.to_stat_bytes());
        if let Some(candidates) = self.hash_to_indices.get(&hash) {
            for &idx in candidates {
                if &self.values[idx as usize] == value {
                    return Some(idx);
                }
            }
        }
        let added = value.value_size();
        if self.size_used + added > self.size_limit {
            self.disabled = true;
            return None;
        }
        let idx = self.values.len() as u32;
        self.values.push(value.clone());
        self.hash_to_indices.entry(hash).or_insert_with(Vec::new).push(idx);
        self.size_used += added;
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{ByteArray, ByteArrayType, Int32Type};

    #[test]
    fn test_dictionary_dedup() {
        let mut dict: ColumnDictionary<Int32Type> = ColumnDictionary::new(1024);
        let i1 = dict.get_or_insert(&1).unwrap();
        let i2 = dict.get_or_insert(&2).unwrap();
        let i1_again = dict.get_or_insert(&1).unwrap();
        assert_eq!(i1, i1_again);
        assert_ne!(i1, i2);
        assert_eq!(dict.num_entries(), 2);
    }

    #[test]
    fn test_dictionary_byte_array_roundtrip() {
        let mut dict: ColumnDictionary<ByteArrayType> = ColumnDictionary::new(1024);
        let words = ["a", "b", "a", "c", "b"];
        let indices: Vec<u32> =
            words.iter().map(|w| dict.get_or_insert(&ByteArray::from(*w)).unwrap()).collect();
        assert_eq!(dict.num_entries(), 3);
        assert_eq!(indices[0], indices[2]);
        assert_eq!(indices[1], indices[4]);
        assert_ne!(indices[0], indices[1]);
        assert_ne!(indices[0], indices[3]);
    }

    #[test]
    fn test_dictionary_size_limit_disables() {
        let mut dict: ColumnDictionary<Int32Type> = ColumnDictionary::new(8);
        assert!(dict.get_or_insert(&1).is_some());
        assert!(dict.get_or_insert(&2).is_some());
        // 3rd distinct 4-byte value exceeds the 8-byte limit.
        assert!(dict.get_or_insert(&3).is_none());
        assert!(dict.is_disabled());
    }
}
