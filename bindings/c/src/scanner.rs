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

use kestrel::client::{ScanBatch, Scanner};
use kestrel::row::RowView;
use std::ffi::c_char;
use std::ptr;

use crate::RUNTIME;
use crate::status::{BridgeResult, kestrel_status, with_status};
use crate::types::{
    free_handle, handle_mut, handle_ref, into_c_string, require_out, str_arg, str_array_arg,
    write_handle,
};

pub struct kestrel_scanner {
    inner: Scanner,
}

impl kestrel_scanner {
    pub(crate) fn new(inner: Scanner) -> Self {
        Self { inner }
    }
}

/// A fetched batch plus a cursor over its rows.
///
/// `position` 0 is before the first row, `n` is row `n - 1`, and anything
/// past `num_rows` means the cursor ran off the end.
pub struct kestrel_scan_batch {
    batch: ScanBatch,
    position: usize,
}

impl kestrel_scan_batch {
    fn current_row(&self) -> BridgeResult<RowView<'_>> {
        self.position
            .checked_sub(1)
            .and_then(|idx| self.batch.row(idx))
            .ok_or_else(|| kestrel_status::illegal_state("no current row"))
    }

    fn has_next(&self) -> bool {
        self.position < self.batch.num_rows()
    }

    fn seek_next(&mut self) {
        self.position = (self.position + 1).min(self.batch.num_rows() + 1);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_free(scanner: *mut kestrel_scanner) {
    unsafe { free_handle(scanner) }
}

/// Only while the scanner is not open. An empty list scans rows without columns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_set_projected_columns(
    scanner: *mut kestrel_scanner,
    column_names: *const *const c_char,
    num_columns: usize,
) -> *mut kestrel_status {
    with_status(|| {
        let scanner = unsafe { handle_mut(scanner, "scanner") }?;
        let names = unsafe { str_array_arg(column_names, num_columns, "column names") }?;
        scanner.inner.set_projected_columns(names)?;
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_set_batch_size_rows(
    scanner: *mut kestrel_scanner,
    batch_size_rows: u32,
) -> *mut kestrel_status {
    with_status(|| {
        let scanner = unsafe { handle_mut(scanner, "scanner") }?;
        scanner.inner.set_batch_size_rows(batch_size_rows)?;
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_open(
    scanner: *mut kestrel_scanner,
) -> *mut kestrel_status {
    with_status(|| {
        let scanner = unsafe { handle_mut(scanner, "scanner") }?;
        RUNTIME.block_on(scanner.inner.open())?;
        Ok(())
    })
}

/// Local check: false once the scan is exhausted or the scanner is not open.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_has_more_rows(scanner: *const kestrel_scanner) -> bool {
    unsafe { scanner.as_ref() }.is_some_and(|s| s.inner.has_more_rows())
}

/// Fetches the next rows into `*batch`, allocating the batch when `*batch`
/// is null. The cursor is reset to before the first row.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scanner_next_batch(
    scanner: *mut kestrel_scanner,
    batch: *mut *mut kestrel_scan_batch,
) -> *mut kestrel_status {
    with_status(|| {
        let scanner = unsafe { handle_mut(scanner, "scanner") }?;
        require_out(batch, "batch slot")?;
        match unsafe { (*batch).as_mut() } {
            Some(existing) => {
                existing.position = 0;
                RUNTIME.block_on(scanner.inner.next_batch(&mut existing.batch))?;
            }
            None => {
                let mut fetched = ScanBatch::default();
                RUNTIME.block_on(scanner.inner.next_batch(&mut fetched))?;
                unsafe {
                    write_handle(
                        batch,
                        kestrel_scan_batch {
                            batch: fetched,
                            position: 0,
                        },
                    )
                };
            }
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_free(batch: *mut kestrel_scan_batch) {
    unsafe { free_handle(batch) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_num_rows(batch: *const kestrel_scan_batch) -> usize {
    unsafe { batch.as_ref() }.map_or(0, |b| b.batch.num_rows())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_has_next(batch: *const kestrel_scan_batch) -> bool {
    unsafe { batch.as_ref() }.is_some_and(|b| b.has_next())
}

/// Moves to the next row. Past the end there is no current row.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_seek_next(batch: *mut kestrel_scan_batch) {
    if let Some(batch) = unsafe { batch.as_mut() } {
        batch.seek_next();
    }
}

/// The current row rendered as text, or null when there is no current row.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_row_to_string(
    batch: *const kestrel_scan_batch,
) -> *mut c_char {
    match unsafe { batch.as_ref() }.map(|b| b.current_row()) {
        Some(Ok(row)) => into_c_string(row.to_string()),
        _ => ptr::null_mut(),
    }
}

unsafe fn read_column<T>(
    batch: *const kestrel_scan_batch,
    column: *const c_char,
    out: *mut T,
    read: impl FnOnce(&RowView<'_>, &str) -> kestrel::error::Result<T>,
) -> *mut kestrel_status {
    with_status(|| {
        let batch = unsafe { handle_ref(batch, "scan batch") }?;
        let column = unsafe { str_arg(column, "column name") }?;
        require_out(out, "value out-parameter")?;
        let value = read(&batch.current_row()?, column)?;
        unsafe { ptr::write(out, value) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_row_is_null(
    batch: *const kestrel_scan_batch,
    column: *const c_char,
    out_is_null: *mut bool,
) -> *mut kestrel_status {
    unsafe { read_column(batch, column, out_is_null, |row, column| row.is_null_by_name(column)) }
}

macro_rules! c_getter {
    ($(#[$doc:meta])* $fn_name:ident, $getter:ident, $ty:ty) => {
        $(#[$doc])*
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $fn_name(
            batch: *const kestrel_scan_batch,
            column: *const c_char,
            out_value: *mut $ty,
        ) -> *mut kestrel_status {
            unsafe { read_column(batch, column, out_value, |row, column| row.$getter(column)) }
        }
    };
}

c_getter!(kestrel_scan_batch_row_get_int8, get_int8_by_name, i8);
c_getter!(kestrel_scan_batch_row_get_int16, get_int16_by_name, i16);
c_getter!(kestrel_scan_batch_row_get_int32, get_int32_by_name, i32);
c_getter!(kestrel_scan_batch_row_get_int64, get_int64_by_name, i64);
c_getter!(kestrel_scan_batch_row_get_bool, get_bool_by_name, bool);
c_getter!(kestrel_scan_batch_row_get_float, get_float_by_name, f32);
c_getter!(kestrel_scan_batch_row_get_double, get_double_by_name, f64);
c_getter!(
    /// Microseconds since the Unix epoch.
    kestrel_scan_batch_row_get_unixtime_micros,
    get_unixtime_micros_by_name,
    i64
);

/// Writes a new string to `out_value`; free it with `kestrel_string_free`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_row_get_string(
    batch: *const kestrel_scan_batch,
    column: *const c_char,
    out_value: *mut *mut c_char,
) -> *mut kestrel_status {
    unsafe {
        read_column(batch, column, out_value, |row, column| {
            row.get_string_by_name(column)
                .map(|value| into_c_string(value.to_string()))
        })
    }
}

/// Borrows the value: the pointer stays valid until the cursor moves, the
/// batch is refilled or the batch is freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_scan_batch_row_get_binary(
    batch: *const kestrel_scan_batch,
    column: *const c_char,
    out_data: *mut *const u8,
    out_len: *mut usize,
) -> *mut kestrel_status {
    with_status(|| {
        let batch = unsafe { handle_ref(batch, "scan batch") }?;
        let column = unsafe { str_arg(column, "column name") }?;
        require_out(out_data, "data out-parameter")?;
        require_out(out_len, "length out-parameter")?;
        let row = batch.current_row()?;
        let value = row.get_binary_by_name(column)?;
        unsafe {
            *out_data = value.as_ptr();
            *out_len = value.len();
        }
        Ok(())
    })
}
