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

use anyhow::anyhow;
use kestrel::metadata::{Schema, SchemaBuilder};
use std::ffi::c_char;
use std::ptr;

use crate::status::{kestrel_status, with_status};
use crate::types::{
    data_type_from_c, data_type_to_c, free_handle, handle_mut, into_c_string,
    require_out, str_arg, str_array_arg, write_handle,
};

/// Columns are collected here and handed to the [`SchemaBuilder`] on `build`.
pub struct kestrel_schema_builder {
    inner: SchemaBuilder,
    columns: Vec<Box<kestrel_column_spec>>,
}

impl kestrel_schema_builder {
    /// Moves the collected columns into `inner`. Returns the first type code
    /// that does not name a data type.
    fn apply_columns(&mut self) -> Option<anyhow::Error> {
        let mut unknown_type = None;
        for column in std::mem::take(&mut self.columns) {
            let column = *column;
            let spec = self.inner.add_column(column.name);
            match column.data_type.map(data_type_from_c) {
                Some(Ok(data_type)) => {
                    spec.data_type(data_type);
                }
                Some(Err(e)) => {
                    unknown_type.get_or_insert_with(|| anyhow!("{e} for column {}", spec.name()));
                }
                None => {}
            }
            match column.nullable {
                Some(true) => {
                    spec.nullable();
                }
                Some(false) => {
                    spec.not_null();
                }
                None => {}
            }
            if column.primary_key {
                spec.primary_key();
            }
        }
        unknown_type
    }
}

/// A column under construction, owned by its schema builder. It is never
/// freed on its own and is valid until the builder is freed.
pub struct kestrel_column_spec {
    name: String,
    data_type: Option<i32>,
    nullable: Option<bool>,
    primary_key: bool,
}

pub struct kestrel_schema {
    inner: Schema,
}

impl kestrel_schema {
    pub(crate) fn schema(&self) -> &Schema {
        &self.inner
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kestrel_schema_builder_create() -> *mut kestrel_schema_builder {
    Box::into_raw(Box::new(kestrel_schema_builder {
        inner: SchemaBuilder::new(),
        columns: Vec::new(),
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_builder_free(builder: *mut kestrel_schema_builder) {
    unsafe { free_handle(builder) }
}

/// Appends a column. Returns null for a null or invalid argument, or when the
/// builder has already been built.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_builder_add_column(
    builder: *mut kestrel_schema_builder,
    name: *const c_char,
) -> *mut kestrel_column_spec {
    let Some(builder) = (unsafe { builder.as_mut() }) else {
        return ptr::null_mut();
    };
    if builder.inner.is_consumed() {
        return ptr::null_mut();
    }
    let Ok(name) = (unsafe { str_arg(name, "column name") }) else {
        return ptr::null_mut();
    };
    builder.columns.push(Box::new(kestrel_column_spec {
        name: name.to_string(),
        data_type: None,
        nullable: None,
        primary_key: false,
    }));
    match builder.columns.last_mut() {
        Some(column) => &mut **column as *mut kestrel_column_spec,
        None => ptr::null_mut(),
    }
}

/// Records the ordered primary key; names are checked by `build`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_builder_set_primary_key(
    builder: *mut kestrel_schema_builder,
    column_names: *const *const c_char,
    num_columns: usize,
) -> *mut kestrel_status {
    with_status(|| {
        let builder = unsafe { handle_mut(builder, "schema builder") }?;
        let names = unsafe { str_array_arg(column_names, num_columns, "column names") }?;
        builder.inner.set_primary_key(names);
        Ok(())
    })
}

/// Validates the columns into a schema. The builder is used up even when
/// validation fails.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_builder_build(
    builder: *mut kestrel_schema_builder,
    out_schema: *mut *mut kestrel_schema,
) -> *mut kestrel_status {
    with_status(|| {
        let builder = unsafe { handle_mut(builder, "schema builder") }?;
        require_out(out_schema, "schema out-parameter")?;
        let unknown_type = builder.apply_columns();
        let result = builder.inner.build();
        if let Some(e) = unknown_type {
            return Err(e.into());
        }
        let schema = result?;
        unsafe { write_handle(out_schema, kestrel_schema { inner: schema }) };
        Ok(())
    })
}

/// `data_type` is one of the `KESTREL_TYPE_*` values; any other value fails
/// the schema build. Returns `spec` so calls can be chained.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_column_spec_set_type(
    spec: *mut kestrel_column_spec,
    data_type: i32,
) -> *mut kestrel_column_spec {
    if let Some(column) = unsafe { spec.as_mut() } {
        column.data_type = Some(data_type);
    }
    spec
}

/// Returns `spec` so calls can be chained.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_column_spec_set_not_null(
    spec: *mut kestrel_column_spec,
) -> *mut kestrel_column_spec {
    if let Some(column) = unsafe { spec.as_mut() } {
        column.nullable = Some(false);
    }
    spec
}

/// Returns `spec` so calls can be chained.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_column_spec_set_nullable(
    spec: *mut kestrel_column_spec,
) -> *mut kestrel_column_spec {
    if let Some(column) = unsafe { spec.as_mut() } {
        column.nullable = Some(true);
    }
    spec
}

/// Returns `spec` so calls can be chained.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_column_spec_set_primary_key(
    spec: *mut kestrel_column_spec,
) -> *mut kestrel_column_spec {
    if let Some(column) = unsafe { spec.as_mut() } {
        column.primary_key = true;
    }
    spec
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_free(schema: *mut kestrel_schema) {
    unsafe { free_handle(schema) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_num_columns(schema: *const kestrel_schema) -> usize {
    unsafe { schema.as_ref() }.map_or(0, |s| s.inner.num_columns())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_num_key_columns(schema: *const kestrel_schema) -> usize {
    unsafe { schema.as_ref() }.map_or(0, |s| s.inner.num_key_columns())
}

/// The column name as a new string, or null when `idx` is out of range.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_column_name(
    schema: *const kestrel_schema,
    idx: usize,
) -> *mut c_char {
    match unsafe { schema.as_ref() }.and_then(|s| s.inner.column(idx)) {
        Some(column) => into_c_string(column.name().to_string()),
        None => ptr::null_mut(),
    }
}

/// One of the `KESTREL_TYPE_*` values, or -1 when `idx` is out of range.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_column_type(
    schema: *const kestrel_schema,
    idx: usize,
) -> i32 {
    unsafe { schema.as_ref() }
        .and_then(|s| s.inner.column(idx))
        .map_or(-1, |column| data_type_to_c(column.data_type()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_schema_column_is_nullable(
    schema: *const kestrel_schema,
    idx: usize,
) -> bool {
    unsafe { schema.as_ref() }
        .and_then(|s| s.inner.column(idx))
        .is_some_and(|column| column.is_nullable())
}
