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

use anyhow::{Result, anyhow, bail};
use kestrel::client::FlushMode;
use kestrel::metadata::DataType;
use std::ffi::{CStr, CString, c_char};
use std::ptr;

pub const KESTREL_TYPE_INT8: i32 = 0;
pub const KESTREL_TYPE_INT16: i32 = 1;
pub const KESTREL_TYPE_INT32: i32 = 2;
pub const KESTREL_TYPE_INT64: i32 = 3;
pub const KESTREL_TYPE_STRING: i32 = 4;
pub const KESTREL_TYPE_BOOL: i32 = 5;
pub const KESTREL_TYPE_FLOAT: i32 = 6;
pub const KESTREL_TYPE_DOUBLE: i32 = 7;
pub const KESTREL_TYPE_BINARY: i32 = 8;
pub const KESTREL_TYPE_UNIXTIME_MICROS: i32 = 9;

pub const KESTREL_AUTO_FLUSH_SYNC: i32 = 0;
pub const KESTREL_AUTO_FLUSH_BACKGROUND: i32 = 1;
pub const KESTREL_MANUAL_FLUSH: i32 = 2;

pub(crate) fn data_type_from_c(value: i32) -> Result<DataType> {
    DataType::from_i32(value).map_err(|_| anyhow!("unknown data type {value}"))
}

pub(crate) fn data_type_to_c(data_type: DataType) -> i32 {
    data_type as i32
}

pub(crate) fn flush_mode_from_c(value: i32) -> Result<FlushMode> {
    match value {
        KESTREL_AUTO_FLUSH_SYNC => Ok(FlushMode::AutoFlushSync),
        KESTREL_AUTO_FLUSH_BACKGROUND => Ok(FlushMode::AutoFlushBackground),
        KESTREL_MANUAL_FLUSH => Ok(FlushMode::ManualFlush),
        _ => bail!("unknown flush mode {value}"),
    }
}

/// Hands `value` to C. Interior NUL bytes are dropped.
pub(crate) fn into_c_string(value: String) -> *mut c_char {
    let c_string = CString::new(value).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c_string.into_raw()
}

/// Releases a string returned by any `kestrel_*` function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(unsafe { CString::from_raw(value) });
    }
}

pub(crate) unsafe fn handle_ref<'a, T>(handle: *const T, what: &str) -> Result<&'a T> {
    unsafe { handle.as_ref() }.ok_or_else(|| anyhow!("null {what}"))
}

pub(crate) unsafe fn handle_mut<'a, T>(handle: *mut T, what: &str) -> Result<&'a mut T> {
    unsafe { handle.as_mut() }.ok_or_else(|| anyhow!("null {what}"))
}

pub(crate) fn require_out<T>(out: *mut T, what: &str) -> Result<()> {
    if out.is_null() {
        bail!("null {what}");
    }
    Ok(())
}

pub(crate) unsafe fn str_arg<'a>(value: *const c_char, what: &str) -> Result<&'a str> {
    if value.is_null() {
        bail!("null {what}");
    }
    unsafe { CStr::from_ptr(value) }
        .to_str()
        .map_err(|e| anyhow!("{what} is not valid UTF-8: {e}"))
}

/// Copies `count` C strings. A zero count may come with a null array.
pub(crate) unsafe fn str_array_arg(
    values: *const *const c_char,
    count: usize,
    what: &str,
) -> Result<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if values.is_null() {
        bail!("null {what}");
    }
    unsafe { std::slice::from_raw_parts(values, count) }
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            unsafe { str_arg(*value, &format!("{what}[{idx}]")) }.map(str::to_string)
        })
        .collect()
}

pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, what: &str) -> Result<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        bail!("null {what}");
    }
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Moves a handle to C and stores it in `out`.
pub(crate) unsafe fn write_handle<T>(out: *mut *mut T, value: T) {
    unsafe { ptr::write(out, Box::into_raw(Box::new(value))) };
}

/// Frees a handle created with `Box::into_raw`; null is ignored.
pub(crate) unsafe fn free_handle<T>(handle: *mut T) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_are_contiguous() {
        for value in 0..=KESTREL_TYPE_UNIXTIME_MICROS {
            let data_type = data_type_from_c(value).unwrap();
            assert_eq!(data_type_to_c(data_type), value);
        }
        assert!(data_type_from_c(10).is_err());
        assert!(data_type_from_c(-1).is_err());
        assert_eq!(flush_mode_from_c(2).unwrap(), FlushMode::ManualFlush);
        assert_eq!(
            flush_mode_from_c(3).unwrap_err().to_string(),
            "unknown flush mode 3"
        );
    }

    #[test]
    fn string_arguments() {
        let a = CString::new("a").unwrap();
        let b = CString::new("b").unwrap();
        let array = [a.as_ptr(), b.as_ptr()];
        unsafe {
            assert_eq!(
                str_array_arg(array.as_ptr(), 2, "names").unwrap(),
                vec!["a", "b"]
            );
            assert!(str_array_arg(ptr::null(), 0, "names").unwrap().is_empty());
            assert_eq!(
                str_array_arg(ptr::null(), 1, "names").unwrap_err().to_string(),
                "null names"
            );
            let with_null = [a.as_ptr(), ptr::null()];
            assert_eq!(
                str_array_arg(with_null.as_ptr(), 2, "names")
                    .unwrap_err()
                    .to_string(),
                "null names[1]"
            );
        }
    }

    #[test]
    fn c_strings_drop_interior_nul() {
        let value = into_c_string("a\0b".to_string());
        unsafe {
            assert_eq!(CStr::from_ptr(value).to_str().unwrap(), "ab");
            kestrel_string_free(value);
        }
    }
}
