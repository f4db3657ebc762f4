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

use kestrel::client::{KestrelTable, WriteOperation};
use kestrel::row::PartialRow;
use std::ffi::c_char;
use std::ptr;

use crate::scanner::kestrel_scanner;
use crate::status::{BridgeResult, kestrel_status, with_status};
use crate::types::{bytes_arg, free_handle, handle_mut, into_c_string, str_arg};

pub struct kestrel_table {
    inner: KestrelTable,
}

impl kestrel_table {
    pub(crate) fn new(inner: KestrelTable) -> Self {
        Self { inner }
    }
}

/// One row mutation. Once applied to a session it belongs to the session.
pub struct kestrel_write_operation {
    inner: WriteOperation,
}

impl kestrel_write_operation {
    pub(crate) fn into_inner(self) -> WriteOperation {
        self.inner
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_close(table: *mut kestrel_table) {
    unsafe { free_handle(table) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_name(table: *const kestrel_table) -> *mut c_char {
    match unsafe { table.as_ref() } {
        Some(table) => into_c_string(table.inner.name().to_string()),
        None => ptr::null_mut(),
    }
}

unsafe fn new_operation(
    table: *const kestrel_table,
    make: fn(&KestrelTable) -> WriteOperation,
) -> *mut kestrel_write_operation {
    match unsafe { table.as_ref() } {
        Some(table) => Box::into_raw(Box::new(kestrel_write_operation {
            inner: make(&table.inner),
        })),
        None => ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_new_insert(
    table: *const kestrel_table,
) -> *mut kestrel_write_operation {
    unsafe { new_operation(table, KestrelTable::new_insert) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_new_update(
    table: *const kestrel_table,
) -> *mut kestrel_write_operation {
    unsafe { new_operation(table, KestrelTable::new_update) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_new_upsert(
    table: *const kestrel_table,
) -> *mut kestrel_write_operation {
    unsafe { new_operation(table, KestrelTable::new_upsert) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_new_delete(
    table: *const kestrel_table,
) -> *mut kestrel_write_operation {
    unsafe { new_operation(table, KestrelTable::new_delete) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_new_scanner(
    table: *const kestrel_table,
) -> *mut kestrel_scanner {
    match unsafe { table.as_ref() } {
        Some(table) => Box::into_raw(Box::new(kestrel_scanner::new(table.inner.new_scanner()))),
        None => ptr::null_mut(),
    }
}

/// Only for operations that were never applied.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_write_operation_free(operation: *mut kestrel_write_operation) {
    unsafe { free_handle(operation) }
}

unsafe fn set_column(
    operation: *mut kestrel_write_operation,
    column: *const c_char,
    set: impl FnOnce(&mut PartialRow, &str) -> BridgeResult<()>,
) -> *mut kestrel_status {
    with_status(|| {
        let operation = unsafe { handle_mut(operation, "write operation") }?;
        let column = unsafe { str_arg(column, "column name") }?;
        set(operation.inner.row_mut(), column)
    })
}

macro_rules! c_setter {
    ($(#[$doc:meta])* $fn_name:ident, $setter:ident, $ty:ty) => {
        $(#[$doc])*
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $fn_name(
            operation: *mut kestrel_write_operation,
            column: *const c_char,
            value: $ty,
        ) -> *mut kestrel_status {
            unsafe {
                set_column(operation, column, |row, column| {
                    row.$setter(column, value).map_err(Into::into)
                })
            }
        }
    };
}

c_setter!(kestrel_write_operation_set_int8, set_int8, i8);
c_setter!(kestrel_write_operation_set_int16, set_int16, i16);
c_setter!(kestrel_write_operation_set_int32, set_int32, i32);
c_setter!(kestrel_write_operation_set_int64, set_int64, i64);
c_setter!(kestrel_write_operation_set_bool, set_bool, bool);
c_setter!(kestrel_write_operation_set_float, set_float, f32);
c_setter!(kestrel_write_operation_set_double, set_double, f64);
c_setter!(
    /// Microseconds since the Unix epoch.
    kestrel_write_operation_set_unixtime_micros,
    set_unixtime_micros,
    i64
);

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_write_operation_set_null(
    operation: *mut kestrel_write_operation,
    column: *const c_char,
) -> *mut kestrel_status {
    unsafe { set_column(operation, column, |row, column| Ok(row.set_null(column)?)) }
}

/// `value` must be NUL-terminated UTF-8; it is copied.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_write_operation_set_string(
    operation: *mut kestrel_write_operation,
    column: *const c_char,
    value: *const c_char,
) -> *mut kestrel_status {
    unsafe {
        set_column(operation, column, |row, column| {
            let value = str_arg(value, "value")?;
            Ok(row.set_string(column, value)?)
        })
    }
}

/// Copies `len` bytes from `data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_write_operation_set_binary(
    operation: *mut kestrel_write_operation,
    column: *const c_char,
    data: *const u8,
    len: usize,
) -> *mut kestrel_status {
    unsafe {
        set_column(operation, column, |row, column| {
            let value = bytes_arg(data, len, "value")?;
            Ok(row.set_binary(column, value)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles() {
        unsafe {
            assert!(kestrel_table_new_insert(ptr::null()).is_null());
            assert!(kestrel_table_new_scanner(ptr::null()).is_null());
            assert!(kestrel_table_name(ptr::null()).is_null());
            let status = kestrel_write_operation_set_int32(ptr::null_mut(), ptr::null(), 1);
            assert_eq!(
                (*status).message(),
                "Invalid argument: null write operation"
            );
            crate::kestrel_status_free(status);
            kestrel_write_operation_free(ptr::null_mut());
            kestrel_table_close(ptr::null_mut());
        }
    }
}
