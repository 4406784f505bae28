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

//! Shared test-only helpers: random value generation for codec round-trip
//! and bit-pack exactness properties.

use rand::distributions::Standard;
use rand::prelude::*;

use crate::data_type::*;

/// Generates random `Vec<T::T>` for round-trip tests. `seed < 0` means
/// "don't bother seeding, just use thread_rng".
pub trait RandGen<T: DataType> {
    fn gen(_: i32) -> T::T;

    fn gen_vec(seed: i32, n: usize) -> Vec<T::T> {
        (0..n).map(|_| Self::gen(seed)).collect()
    }
}

impl RandGen<BoolType> for BoolType {
    fn gen(_: i32) -> bool {
        thread_rng().gen()
    }
}

impl RandGen<Int32Type> for Int32Type {
    fn gen(_: i32) -> i32 {
        thread_rng().sample(Standard)
    }
}

impl RandGen<Int64Type> for Int64Type {
    fn gen(_: i32) -> i64 {
        thread_rng().sample(Standard)
    }
}

impl RandGen<FloatType> for FloatType {
    fn gen(_: i32) -> f32 {
        thread_rng().gen_range(-1e10..1e10)
    }
}

impl RandGen<DoubleType> for DoubleType {
    fn gen(_: i32) -> f64 {
        thread_rng().gen_range(-1e10..1e10)
    }
}

impl RandGen<Int96Type> for Int96Type {
    fn gen(_: i32) -> Int96 {
        let mut rng = thread_rng();
        Int96::from(vec![rng.gen(), rng.gen(), rng.gen()])
    }
}

impl RandGen<ByteArrayType> for ByteArrayType {
    fn gen(_: i32) -> ByteArray {
        let mut rng = thread_rng();
        let len = rng.gen_range(1..12);
        let v: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        ByteArray::from(v)
    }
}

/// Returns `n` random `i32`s within `[min, max]`.
pub fn random_numbers_range(n: usize, min: i32, max: i32, result: &mut Vec<i32>) {
    let mut rng = thread_rng();
    for _ in 0..n {
        result.push(rng.gen_range(min..=max));
    }
}
