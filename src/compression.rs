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

//! The block-compression boundary. The column/page layer only ever talks to
//! a `Codec`; the algorithms themselves (other than the trivial identity
//! codec) are thin wrappers over external crates (`snap`, `flate2`,
//! `brotli`, `lz4_flex`, `zstd`). Out of scope: choosing which codec to use
//! for a given chunk, and anything about the algorithms beyond this crate
//! boundary.

use std::io::{Read, Write};

use crate::basic::Compression;
use crate::errors::Result;

pub trait Codec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>>;
}

pub fn create_codec(codec: Compression) -> Result<Box<dyn Codec>> {
    match codec {
        Compression::UNCOMPRESSED => Ok(Box::new(IdentityCodec)),
        Compression::SNAPPY => Ok(Box::new(SnappyCodec)),
        Compression::GZIP => Ok(Box::new(GzipCodec)),
        Compression::BROTLI => Ok(Box::new(BrotliCodec)),
        Compression::LZ4 => Ok(Box::new(Lz4Codec)),
        Compression::ZSTD => Ok(Box::new(ZstdCodec)),
    }
}

struct IdentityCodec;

impl Codec for IdentityCodec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        if input.len() != uncompressed_size {
            return Err(general_err!(
                "Uncompressed codec size mismatch: expected {}, got {}",
                uncompressed_size,
                input.len()
            ));
        }
        Ok(input.to_vec())
    }
}

struct SnappyCodec;

impl Codec for SnappyCodec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = snap::raw::Encoder::new();
        encoder
            .compress_vec(input)
            .map_err(|e| general_err!("Snappy compression failed: {}", e))
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut decoder = snap::raw::Decoder::new();
        let out = decoder
            .decompress_vec(input)
            .map_err(|e| general_err!("Snappy decompression failed: {}", e))?;
        if out.len() != uncompressed_size {
            return Err(general_err!(
                "Snappy uncompressed size mismatch: expected {}, got {}",
                uncompressed_size,
                out.len()
            ));
        }
        Ok(out)
    }
}

struct GzipCodec;

impl Codec for GzipCodec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(input).map_err(crate::errors::ParquetError::from)?;
        encoder.finish().map_err(crate::errors::ParquetError::from)
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(input);
        let mut out = Vec::with_capacity(uncompressed_size);
        decoder.read_to_end(&mut out).map_err(crate::errors::ParquetError::from)?;
        if out.len() != uncompressed_size {
            return Err(general_err!(
                "Gzip uncompressed size mismatch: expected {}, got {}",
                uncompressed_size,
                out.len()
            ));
        }
        Ok(out)
    }
}

struct BrotliCodec;

impl Codec for BrotliCodec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::BrotliCompress(&mut &input[..], &mut out, &params)
            .map_err(|e| general_err!("Brotli compression failed: {}", e))?;
        Ok(out)
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_size);
        brotli::BrotliDecompress(&mut &input[..], &mut out)
            .map_err(|e| general_err!("Brotli decompression failed: {}", e))?;
        if out.len() != uncompressed_size {
            return Err(general_err!(
                "Brotli uncompressed size mismatch: expected {}, got {}",
                uncompressed_size,
                out.len()
            ));
        }
        Ok(out)
    }
}

struct Lz4Codec;

impl Codec for Lz4Codec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress(input))
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        lz4_flex::block::decompress(input, uncompressed_size)
            .map_err(|e| general_err!("LZ4 decompression failed: {}", e))
    }
}

struct ZstdCodec;

impl Codec for ZstdCodec {
    fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::encode_all(input, 0).map_err(crate::errors::ParquetError::from)
    }

    fn decompress(&mut self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let out = zstd::stream::decode_all(input).map_err(crate::errors::ParquetError::from)?;
        if out.len() != uncompressed_size {
            return Err(general_err!(
                "Zstd uncompressed size mismatch: expected {}, got {}",
                uncompressed_size,
                out.len()
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(codec: Compression) {
        let mut c = create_codec(codec).unwrap();
        let input = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = c.compress(&input).unwrap();
        let decompressed = c.decompress(&compressed, input.len()).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_identity_roundtrip() {
        roundtrip(Compression::UNCOMPRESSED);
    }

    #[test]
    fn test_snappy_roundtrip() {
        roundtrip(Compression::SNAPPY);
    }

    #[test]
    fn test_gzip_roundtrip() {
        roundtrip(Compression::GZIP);
    }

    #[test]
    fn test_brotli_roundtrip() {
        roundtrip(Compression::BROTLI);
    }

    #[test]
    fn test_lz4_roundtrip() {
        roundtrip(Compression::LZ4);
    }

    #[test]
    fn test_zstd_roundtrip() {
        roundtrip(Compression::ZSTD);
    }

    #[test]
    fn test_identity_rejects_size_mismatch() {
        let mut c = create_codec(Compression::UNCOMPRESSED).unwrap();
        assert!(c.decompress(b"abc", 10).is_err());
    }
}
