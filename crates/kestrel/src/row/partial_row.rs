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
use crate::proto::PbCell;
use crate::row::Datum;
use std::fmt::{Display, Formatter};

/// A row in which only some columns have been set.
///
/// Values must match the column type exactly; there is no implicit widening.
#[derive(Debug, Clone)]
pub struct PartialRow {
    schema: Schema,
    values: Vec<Option<Datum>>,
}

macro_rules! typed_setter {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $variant:ident) => {
        $(#[$doc])*
        pub fn $name(&mut self, column: &str, value: $ty) -> Result<()> {
            self.set_by_name(column, Datum::$variant(value.into()))
        }
    };
}

impl PartialRow {
    pub fn new(schema: Schema) -> Self {
        let values = vec![None; schema.num_columns()];
        Self { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sets column `idx`. `Datum::Null` is only accepted for nullable columns.
    pub fn set(&mut self, idx: usize, datum: Datum) -> Result<()> {
        let column = self.schema.column(idx).ok_or_else(|| Error::IllegalArgument {
            message: format!(
                "column index {idx} out of range for {} columns",
                self.schema.num_columns()
            ),
        })?;
        match datum.data_type() {
            None if !column.is_nullable() => {
                return Err(Error::NullValue {
                    column: column.name().to_string(),
                });
            }
            Some(data_type) if data_type != column.data_type() => {
                return Err(Error::TypeMismatch {
                    column: column.name().to_string(),
                    column_type: column.data_type(),
                    requested_type: data_type,
                });
            }
            _ => {}
        }
        self.values[idx] = Some(datum);
        Ok(())
    }

    pub fn set_by_name(&mut self, column: &str, datum: Datum) -> Result<()> {
        let idx = self.schema.column_index(column)?;
        self.set(idx, datum)
    }

    typed_setter!(set_int8, i8, Int8);
    typed_setter!(set_int16, i16, Int16);
    typed_setter!(set_int32, i32, Int32);
    typed_setter!(set_int64, i64, Int64);
    typed_setter!(set_string, &str, String);
    typed_setter!(set_bool, bool, Bool);
    typed_setter!(set_float, f32, Float);
    typed_setter!(set_double, f64, Double);
    typed_setter!(set_binary, &[u8], Binary);
    typed_setter!(
        /// Microseconds since the Unix epoch.
        set_unixtime_micros,
        i64,
        UnixtimeMicros
    );

    pub fn set_null(&mut self, column: &str) -> Result<()> {
        self.set_by_name(column, Datum::Null)
    }

    /// Reverts a column to the unset state.
    pub fn unset(&mut self, column: &str) -> Result<()> {
        let idx = self.schema.column_index(column)?;
        self.values[idx] = None;
        Ok(())
    }

    pub fn is_set(&self, idx: usize) -> bool {
        matches!(self.values.get(idx), Some(Some(_)))
    }

    pub fn is_null(&self, idx: usize) -> bool {
        matches!(self.values.get(idx), Some(Some(Datum::Null)))
    }

    pub fn get(&self, idx: usize) -> Option<&Datum> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    pub fn is_key_set(&self) -> bool {
        (0..self.schema.num_key_columns()).all(|idx| self.is_set(idx))
    }

    /// Names of the required columns (key columns, plus every non-nullable
    /// column when `include_not_null`) that have not been set.
    pub fn missing_columns(&self, include_not_null: bool) -> Vec<&str> {
        self.schema
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, column)| {
                let required = self.schema.is_key_column(*idx)
                    || (include_not_null && !column.is_nullable());
                required && !self.is_set(*idx)
            })
            .map(|(_, column)| column.name())
            .collect()
    }

    pub fn to_cells(&self, key_only: bool) -> Vec<PbCell> {
        self.values
            .iter()
            .enumerate()
            .filter(|(idx, _)| !key_only || self.schema.is_key_column(*idx))
            .filter_map(|(idx, value)| {
                value.as_ref().map(|datum| PbCell {
                    column_index: idx as u32,
                    datum: Some(datum.to_pb()),
                })
            })
            .collect()
    }

    pub fn from_cells(schema: Schema, cells: Vec<PbCell>) -> Result<Self> {
        let mut row = Self::new(schema);
        for cell in cells {
            let datum = Datum::from_pb(cell.datum.unwrap_or_default())?;
            row.set(cell.column_index as usize, datum)?;
        }
        Ok(row)
    }

    /// Every column value, NULL for unset columns.
    pub fn into_values(self) -> Vec<Datum> {
        self.values
            .into_iter()
            .map(|v| v.unwrap_or(Datum::Null))
            .collect()
    }

    pub fn column_type(&self, idx: usize) -> Option<DataType> {
        self.schema.column(idx).map(|c| c.data_type())
    }
}

impl Display for PartialRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        let mut first = true;
        for (column, value) in self.schema.columns().iter().zip(&self.values) {
            let Some(value) = value else { continue };
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{} {}={value}", column.data_type(), column.name())?;
        }
        f.write_str(")")
    }
}
