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

//! The dictionary store's hash-key rule: scalars hash as themselves, byte
//! sequences hash via FNV-1a. This trades theoretical
//! collision robustness for a cheap hot-path key; a collision only costs a
//! missed deduplication, never correctness.

const FNV64_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV64_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a over `data`.
pub fn fnv_hash_64(data: &[u8]) -> u64 {
    let mut hash = FNV64_OFFSET_BASIS;
    for &b in data {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_hash_deterministic() {
        assert_eq!(fnv_hash_64(b"a"), fnv_hash_64(b"a"));
        assert_ne!(fnv_hash_64(b"a"), fnv_hash_64(b"b"));
    }

    #[test]
    fn test_fnv_hash_empty() {
        assert_eq!(fnv_hash_64(b""), FNV64_OFFSET_BASIS);
    }
}
