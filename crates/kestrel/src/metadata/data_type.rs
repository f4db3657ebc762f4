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

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Column types. The discriminants are stable and shared with the C API and
/// the wire protocol.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    String = 4,
    Bool = 5,
    Float = 6,
    Double = 7,
    Binary = 8,
    UnixtimeMicros = 9,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::String,
        DataType::Bool,
        DataType::Float,
        DataType::Double,
        DataType::Binary,
        DataType::UnixtimeMicros,
    ];

    pub fn from_i32(value: i32) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| Error::IllegalArgument {
                message: format!("unknown data type: {value}"),
            })
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Binary => "binary",
            DataType::UnixtimeMicros => "unixtime_micros",
        }
    }

    /// Whether a column of this type may be part of the primary key.
    pub fn is_key_type(&self) -> bool {
        !matches!(self, DataType::Bool | DataType::Float | DataType::Double)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_contiguous_from_zero() {
        for (idx, data_type) in DataType::ALL.iter().enumerate() {
            assert_eq!(data_type.as_i32(), idx as i32);
            assert_eq!(DataType::from_i32(idx as i32).unwrap(), *data_type);
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(DataType::from_i32(-1).is_err());
        assert!(DataType::from_i32(10).is_err());
    }

    #[test]
    fn key_types() {
        assert!(DataType::Int32.is_key_type());
        assert!(DataType::String.is_key_type());
        assert!(DataType::UnixtimeMicros.is_key_type());
        assert!(!DataType::Bool.is_key_type());
        assert!(!DataType::Double.is_key_type());
    }
}
