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
use crate::metadata::{DataType, Schema};
use crate::row::Datum;
use std::fmt::{Display, Formatter};

/// A borrowed, read-only row of a scan result, in projection order.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a Schema,
    values: &'a [Datum],
}

macro_rules! typed_getter {
    ($name:ident, $by_name:ident, $ty:ty, $variant:ident, $data_type:expr) => {
        pub fn $name(&self, idx: usize) -> Result<$ty> {
            match self.checked(idx, $data_type)? {
                Datum::$variant(v) => Ok(*v),
                other => Err(self.unexpected(idx, other)),
            }
        }

        pub fn $by_name(&self, column: &str) -> Result<$ty> {
            self.$name(self.column_index(column)?)
        }
    };
}

impl<'a> RowView<'a> {
    pub fn new(schema: &'a Schema, values: &'a [Datum]) -> Self {
        Self { schema, values }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema.column_index(name)
    }

    pub fn datum(&self, idx: usize) -> Result<&'a Datum> {
        self.values.get(idx).ok_or_else(|| Error::IllegalArgument {
            message: format!(
                "column index {idx} out of range for {} projected columns",
                self.values.len()
            ),
        })
    }

    pub fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(self.datum(idx)?.is_null())
    }

    pub fn is_null_by_name(&self, column: &str) -> Result<bool> {
        self.is_null(self.column_index(column)?)
    }

    fn checked(&self, idx: usize, requested_type: DataType) -> Result<&'a Datum> {
        let datum = self.datum(idx)?;
        let column = self.schema.column(idx).ok_or_else(|| Error::IllegalArgument {
            message: format!("column index {idx} out of range"),
        })?;
        if column.data_type() != requested_type {
            return Err(Error::TypeMismatch {
                column: column.name().to_string(),
                column_type: column.data_type(),
                requested_type,
            });
        }
        if datum.is_null() {
            return Err(Error::IllegalState {
                message: format!("column {} is NULL", column.name()),
            });
        }
        Ok(datum)
    }

    fn unexpected(&self, idx: usize, datum: &Datum) -> Error {
        Error::UnexpectedError {
            message: format!("column {idx} holds {datum:?}, which does not match its schema"),
            source: None,
        }
    }

    typed_getter!(get_int8, get_int8_by_name, i8, Int8, DataType::Int8);
    typed_getter!(get_int16, get_int16_by_name, i16, Int16, DataType::Int16);
    typed_getter!(get_int32, get_int32_by_name, i32, Int32, DataType::Int32);
    typed_getter!(get_int64, get_int64_by_name, i64, Int64, DataType::Int64);
    typed_getter!(get_bool, get_bool_by_name, bool, Bool, DataType::Bool);
    typed_getter!(get_float, get_float_by_name, f32, Float, DataType::Float);
    typed_getter!(get_double, get_double_by_name, f64, Double, DataType::Double);
    typed_getter!(
        get_unixtime_micros,
        get_unixtime_micros_by_name,
        i64,
        UnixtimeMicros,
        DataType::UnixtimeMicros
    );

    pub fn get_string(&self, idx: usize) -> Result<&'a str> {
        match self.checked(idx, DataType::String)? {
            Datum::String(v) => Ok(v.as_str()),
            other => Err(self.unexpected(idx, other)),
        }
    }

    pub fn get_binary(&self, idx: usize) -> Result<&'a [u8]> {
        match self.checked(idx, DataType::Binary)? {
            Datum::Binary(v) => Ok(v.as_slice()),
            other => Err(self.unexpected(idx, other)),
        }
    }

    pub fn get_string_by_name(&self, column: &str) -> Result<&'a str> {
        self.get_string(self.column_index(column)?)
    }

    pub fn get_binary_by_name(&self, column: &str) -> Result<&'a [u8]> {
        self.get_binary(self.column_index(column)?)
    }
}

/// `(int32 id=1, string name="a", binary payload=NULL)`
impl Display for RowView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for (idx, (column, value)) in self.schema.columns().iter().zip(self.values).enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}={value}", column.data_type(), column.name())?;
        }
        f.write_str(")")
    }
}
