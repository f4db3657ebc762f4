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
use crate::metadata::DataType;
use crate::proto::{PbColumnSchema, PbSchema};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn to_pb(&self) -> PbColumnSchema {
        PbColumnSchema {
            name: self.name.clone(),
            data_type: self.data_type.as_i32(),
            nullable: self.nullable,
        }
    }

    pub fn from_pb(pb: &PbColumnSchema) -> Result<Self> {
        Ok(Self {
            name: pb.name.clone(),
            data_type: DataType::from_i32(pb.data_type)?,
            nullable: pb.nullable,
        })
    }
}

/// Immutable, validated table layout.
///
/// Primary key columns are always the leading columns. Cloning is cheap, all
/// clones share the same column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug, PartialEq, Eq)]
struct SchemaInner {
    columns: Vec<ColumnSchema>,
    num_key_columns: usize,
    column_indexes: HashMap<String, usize>,
}

impl Schema {
    /// Creates a schema whose first `num_key_columns` columns form the primary key.
    pub fn new(columns: Vec<ColumnSchema>, num_key_columns: usize) -> Result<Self> {
        if columns.is_empty() {
            return Err(invalid_schema("schema must have at least one column"));
        }
        if num_key_columns == 0 {
            return Err(invalid_schema("no primary key specified"));
        }
        if num_key_columns > columns.len() {
            return Err(invalid_schema(format!(
                "{num_key_columns} key columns declared but the schema has only {} columns",
                columns.len()
            )));
        }
        for column in &columns[..num_key_columns] {
            if column.nullable {
                return Err(invalid_schema(format!(
                    "primary key column {} must not be nullable",
                    column.name
                )));
            }
            if !column.data_type.is_key_type() {
                return Err(invalid_schema(format!(
                    "primary key column {} has unsupported key type {}",
                    column.name, column.data_type
                )));
            }
        }
        Self::from_columns(columns, num_key_columns)
    }

    fn from_columns(columns: Vec<ColumnSchema>, num_key_columns: usize) -> Result<Self> {
        let mut column_indexes = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(invalid_schema("column names must not be empty"));
            }
            if column_indexes.insert(column.name.clone(), idx).is_some() {
                return Err(invalid_schema(format!("duplicate column name: {}", column.name)));
            }
        }
        Ok(Self {
            inner: Arc::new(SchemaInner {
                columns,
                num_key_columns,
                column_indexes,
            }),
        })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.inner.columns
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnSchema> {
        self.inner.columns.get(idx)
    }

    pub fn num_columns(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn num_key_columns(&self) -> usize {
        self.inner.num_key_columns
    }

    pub fn is_key_column(&self, idx: usize) -> bool {
        idx < self.inner.num_key_columns
    }

    pub fn primary_key_indexes(&self) -> Vec<usize> {
        (0..self.inner.num_key_columns).collect()
    }

    pub fn primary_key_names(&self) -> Vec<&str> {
        self.inner.columns[..self.inner.num_key_columns]
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.inner.column_indexes.get(name).copied()
    }

    /// Like [`find_column`](Self::find_column), failing with [`Error::ColumnNotFound`].
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.find_column(name).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })
    }

    /// Schema of the given columns in the given order. The result carries no
    /// primary key.
    pub fn project(&self, indexes: &[usize]) -> Result<Schema> {
        let columns = indexes
            .iter()
            .map(|idx| {
                self.column(*idx)
                    .cloned()
                    .ok_or_else(|| Error::IllegalArgument {
                        message: format!(
                            "projected column index {idx} out of range for {} columns",
                            self.num_columns()
                        ),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Ok(Self::default());
        }
        Self::from_columns(columns, 0)
    }

    pub fn to_pb(&self) -> PbSchema {
        PbSchema {
            columns: self.inner.columns.iter().map(ColumnSchema::to_pb).collect(),
            num_key_columns: self.inner.num_key_columns as u32,
        }
    }

    pub fn from_pb(pb: &PbSchema) -> Result<Self> {
        let columns = pb
            .columns
            .iter()
            .map(ColumnSchema::from_pb)
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns, pb.num_key_columns as usize)
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "(")?;
        for column in self.columns() {
            let nullability = if column.nullable { "NULLABLE" } else { "NOT NULL" };
            writeln!(
                f,
                "    {} {} {nullability},",
                column.name,
                column.data_type.name().to_uppercase()
            )?;
        }
        writeln!(f, "    PRIMARY KEY ({})", self.primary_key_names().join(", "))?;
        write!(f, ")")
    }
}

/// A schema without columns; the projection of an empty column list.
impl Default for Schema {
    fn default() -> Self {
        Self {
            inner: Arc::new(SchemaInner {
                columns: Vec::new(),
                num_key_columns: 0,
                column_indexes: HashMap::new(),
            }),
        }
    }
}

fn invalid_schema(message: impl Into<String>) -> Error {
    Error::InvalidSchema {
        message: message.into(),
    }
}

/// One column under construction. Obtained from [`SchemaBuilder::add_column`];
/// every setter returns the same spec so calls can be chained.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    name: String,
    data_type: Option<DataType>,
    nullable: Option<bool>,
    primary_key: bool,
}

impl ColumnSpec {
    fn new(name: String) -> Self {
        Self {
            name,
            data_type: None,
            nullable: None,
            primary_key: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    /// Marks this column as the (single-column) primary key.
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self
    }
}

/// Accumulates column definitions and turns them into a [`Schema`].
///
/// Column specs are boxed, so a `&mut ColumnSpec` handed out by
/// [`add_column`](Self::add_column) points at memory that does not move when
/// more columns are added.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    columns: Vec<Box<ColumnSpec>>,
    key_columns: Option<Vec<String>>,
    consumed: bool,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. Columns keep the order in which they were added.
    pub fn add_column(&mut self, name: impl Into<String>) -> &mut ColumnSpec {
        self.columns.push(Box::new(ColumnSpec::new(name.into())));
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    /// Records the ordered primary key. Names are checked by [`build`](Self::build).
    pub fn set_primary_key<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Validates the accumulated definition and freezes it into a [`Schema`].
    ///
    /// The builder is consumed even when validation fails; a second call
    /// returns [`Error::IllegalState`].
    pub fn build(&mut self) -> Result<Schema> {
        if self.consumed {
            return Err(Error::IllegalState {
                message: "schema builder has already been used".to_string(),
            });
        }
        self.consumed = true;
        let specs = std::mem::take(&mut self.columns);
        Self::build_schema(specs, self.key_columns.take())
    }

    fn build_schema(
        specs: Vec<Box<ColumnSpec>>,
        key_columns: Option<Vec<String>>,
    ) -> Result<Schema> {
        if specs.is_empty() {
            return Err(invalid_schema("schema must have at least one column"));
        }

        let mut seen = HashSet::with_capacity(specs.len());
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(invalid_schema(format!("duplicate column name: {}", spec.name)));
            }
            if spec.data_type.is_none() {
                return Err(invalid_schema(format!("no type specified for column {}", spec.name)));
            }
        }

        let flagged: Vec<&str> = specs
            .iter()
            .filter(|s| s.primary_key)
            .map(|s| s.name.as_str())
            .collect();
        let key_columns: Vec<String> = match key_columns {
            Some(names) => {
                if let Some(name) = flagged.first() {
                    return Err(invalid_schema(format!(
                        "primary key specified by both set_primary_key() and on column {name}"
                    )));
                }
                names
            }
            None => {
                if flagged.len() > 1 {
                    return Err(invalid_schema(format!(
                        "multiple columns marked as primary key: {}; \
                         use set_primary_key() for a compound key",
                        flagged.join(", ")
                    )));
                }
                flagged.into_iter().map(str::to_string).collect()
            }
        };
        if key_columns.is_empty() {
            return Err(invalid_schema("no primary key specified"));
        }

        let mut key_seen = HashSet::with_capacity(key_columns.len());
        for (key_idx, key_name) in key_columns.iter().enumerate() {
            if !key_seen.insert(key_name.as_str()) {
                return Err(invalid_schema(format!(
                    "primary key column listed twice: {key_name}"
                )));
            }
            match specs.iter().position(|s| &s.name == key_name) {
                None => {
                    return Err(invalid_schema(format!(
                        "primary key column not defined: {key_name}"
                    )));
                }
                Some(idx) if idx != key_idx => {
                    return Err(invalid_schema(format!(
                        "primary key columns must be listed first in the schema: {key_name}"
                    )));
                }
                Some(_) => {}
            }
        }

        let num_key_columns = key_columns.len();
        let mut columns = Vec::with_capacity(specs.len());
        for (idx, spec) in specs.into_iter().enumerate() {
            let spec = *spec;
            let Some(data_type) = spec.data_type else {
                return Err(invalid_schema(format!("no type specified for column {}", spec.name)));
            };
            let nullable = if idx < num_key_columns {
                if spec.nullable == Some(true) {
                    return Err(invalid_schema(format!(
                        "primary key column {} must not be nullable",
                        spec.name
                    )));
                }
                false
            } else {
                spec.nullable.unwrap_or(true)
            };
            columns.push(ColumnSchema::new(spec.name, data_type, nullable));
        }

        Schema::new(columns, num_key_columns)
    }
}
