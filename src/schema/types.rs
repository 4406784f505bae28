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

use std::fmt;
use std::rc::Rc;

use crate::basic::{LogicalType, Repetition, Type};

/// Dotted path identifying a column within the (out-of-scope) nested
/// schema tree, e.g. `a.b.c`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnPath {
    parts: Vec<String>,
}

impl ColumnPath {
    pub fn new(parts: Vec<String>) -> Self {
        ColumnPath { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl<'a> From<&'a str> for ColumnPath {
    fn from(s: &'a str) -> Self {
        ColumnPath::new(s.split('.').map(|p| p.to_string()).collect())
    }
}

/// A single column's declared type: physical type, optional fixed length,
/// optional logical/converted type annotation (opaque, forwarded verbatim),
/// optional numeric scale/precision, optional field id, and repetition kind.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveTypeInfo {
    name: String,
    physical_type: Type,
    repetition: Repetition,
    logical_type: LogicalType,
    length: i32,
    precision: i32,
    scale: i32,
    field_id: Option<i32>,
}

pub struct PrimitiveTypeBuilder {
    name: String,
    physical_type: Type,
    repetition: Repetition,
    logical_type: LogicalType,
    length: i32,
    precision: i32,
    scale: i32,
    field_id: Option<i32>,
}

impl PrimitiveTypeBuilder {
    pub fn new(name: &str, physical_type: Type) -> Self {
        PrimitiveTypeBuilder {
            name: name.to_string(),
            physical_type,
            repetition: Repetition::REQUIRED,
            logical_type: LogicalType::NONE,
            length: -1,
            precision: -1,
            scale: -1,
            field_id: None,
        }
    }

    pub fn with_repetition(mut self, r: Repetition) -> Self {
        self.repetition = r;
        self
    }

    pub fn with_logical_type(mut self, lt: LogicalType) -> Self {
        self.logical_type = lt;
        self
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    pub fn with_precision_scale(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_field_id(mut self, id: i32) -> Self {
        self.field_id = Some(id);
        self
    }

    pub fn build(self) -> crate::Result<PrimitiveTypeInfo> {
        if self.physical_type == Type::FIXED_LEN_BYTE_ARRAY && self.length < 0 {
            return Err(general_err!(
                "FIXED_LEN_BYTE_ARRAY column '{}' must declare a length",
                self.name
            ));
        }
        Ok(PrimitiveTypeInfo {
            name: self.name,
            physical_type: self.physical_type,
            repetition: self.repetition,
            logical_type: self.logical_type,
            length: self.length,
            precision: self.precision,
            scale: self.scale,
            field_id: self.field_id,
        })
    }
}

impl PrimitiveTypeInfo {
    pub fn primitive_type_builder(name: &str, physical_type: Type) -> PrimitiveTypeBuilder {
        PrimitiveTypeBuilder::new(name, physical_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical_type(&self) -> Type {
        self.physical_type
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    pub fn type_length(&self) -> i32 {
        self.length
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn field_id(&self) -> Option<i32> {
        self.field_id
    }
}

/// Everything a column codec needs about the column it is reading/writing:
/// its declared type plus the precomputed maxD/maxR for its schema path.
#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    type_info: Rc<PrimitiveTypeInfo>,
    max_def_level: i16,
    max_rep_level: i16,
    path: ColumnPath,
}

pub type ColumnDescPtr = Rc<ColumnDescriptor>;

impl ColumnDescriptor {
    pub fn new(
        type_info: Rc<PrimitiveTypeInfo>,
        max_def_level: i16,
        max_rep_level: i16,
        path: ColumnPath,
    ) -> Self {
        ColumnDescriptor { type_info, max_def_level, max_rep_level, path }
    }

    pub fn physical_type(&self) -> Type {
        self.type_info.physical_type()
    }

    pub fn repetition(&self) -> Repetition {
        self.type_info.repetition()
    }

    pub fn type_length(&self) -> i32 {
        self.type_info.type_length()
    }

    pub fn max_def_level(&self) -> i16 {
        self.max_def_level
    }

    pub fn max_rep_level(&self) -> i16 {
        self.max_rep_level
    }

    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn type_info(&self) -> &PrimitiveTypeInfo {
        &self.type_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_len_byte_array_requires_length() {
        let result = PrimitiveTypeInfo::primitive_type_builder("a", Type::FIXED_LEN_BYTE_ARRAY).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_column_descriptor_levels() {
        let t = PrimitiveTypeInfo::primitive_type_builder("a", Type::INT32)
            .with_repetition(Repetition::OPTIONAL)
            .build()
            .unwrap();
        let descr = ColumnDescriptor::new(Rc::new(t), 1, 0, ColumnPath::from("a"));
        assert_eq!(descr.max_def_level(), 1);
        assert_eq!(descr.max_rep_level(), 0);
    }
}
