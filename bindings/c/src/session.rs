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

use kestrel::client::{RowError, Session};
use std::ffi::c_char;
use std::ptr;

use crate::RUNTIME;
use crate::status::{kestrel_status, with_status};
use crate::table::kestrel_write_operation;
use crate::types::{
    flush_mode_from_c, free_handle, handle_mut, into_c_string, require_out, write_handle,
};

pub struct kestrel_session {
    inner: Session,
}

impl kestrel_session {
    pub(crate) fn new(inner: Session) -> Self {
        Self { inner }
    }
}

/// Rows a session failed to apply, taken out of the session by
/// [`kestrel_session_get_pending_errors`].
pub struct kestrel_row_errors {
    errors: Vec<RowError>,
}

unsafe fn row_error<'a>(errors: *const kestrel_row_errors, idx: usize) -> Option<&'a RowError> {
    unsafe { errors.as_ref() }.and_then(|e| e.errors.get(idx))
}

/// Releases the session. Buffered operations that were not flushed are
/// discarded; batches already sent complete in the background.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_close(session: *mut kestrel_session) {
    unsafe { free_handle(session) }
}

/// `mode` is one of the `KESTREL_*_FLUSH*` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_set_flush_mode(
    session: *mut kestrel_session,
    mode: i32,
) -> *mut kestrel_status {
    with_status(|| {
        let session = unsafe { handle_mut(session, "session") }?;
        let mode = flush_mode_from_c(mode)?;
        session.inner.set_flush_mode(mode)?;
        Ok(())
    })
}

/// Takes ownership of `operation` whatever the outcome; do not free it afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_apply(
    session: *mut kestrel_session,
    operation: *mut kestrel_write_operation,
) -> *mut kestrel_status {
    let operation = (!operation.is_null()).then(|| unsafe { Box::from_raw(operation) });
    with_status(|| {
        let session = unsafe { handle_mut(session, "session") }?;
        let operation = operation.ok_or_else(|| anyhow::anyhow!("null write operation"))?;
        RUNTIME.block_on(session.inner.apply((*operation).into_inner()))?;
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_flush(
    session: *mut kestrel_session,
) -> *mut kestrel_status {
    with_status(|| {
        let session = unsafe { handle_mut(session, "session") }?;
        RUNTIME.block_on(session.inner.flush())?;
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_has_pending_operations(
    session: *const kestrel_session,
) -> bool {
    unsafe { session.as_ref() }.is_some_and(|s| s.inner.has_pending_operations())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_count_buffered_operations(
    session: *const kestrel_session,
) -> usize {
    unsafe { session.as_ref() }.map_or(0, |s| s.inner.count_buffered_operations())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_count_pending_errors(
    session: *const kestrel_session,
) -> usize {
    unsafe { session.as_ref() }.map_or(0, |s| s.inner.count_pending_errors())
}

/// Moves the row errors collected so far into a new list and clears them from
/// the session. Free the list with [`kestrel_row_errors_free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_session_get_pending_errors(
    session: *mut kestrel_session,
    out_errors: *mut *mut kestrel_row_errors,
) -> *mut kestrel_status {
    with_status(|| {
        let session = unsafe { handle_mut(session, "session") }?;
        require_out(out_errors, "errors out-parameter")?;
        let errors = session.inner.pending_errors();
        unsafe { write_handle(out_errors, kestrel_row_errors { errors }) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_row_errors_free(errors: *mut kestrel_row_errors) {
    unsafe { free_handle(errors) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_row_errors_count(errors: *const kestrel_row_errors) -> usize {
    unsafe { errors.as_ref() }.map_or(0, |e| e.errors.len())
}

/// The protocol error code of row `idx`, or 0 when `idx` is out of range.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_row_errors_code(
    errors: *const kestrel_row_errors,
    idx: usize,
) -> i32 {
    unsafe { row_error(errors, idx) }.map_or(0, |e| e.error().code)
}

/// Why row `idx` failed, as a new string; null when `idx` is out of range.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_row_errors_message(
    errors: *const kestrel_row_errors,
    idx: usize,
) -> *mut c_char {
    match unsafe { row_error(errors, idx) } {
        Some(e) => into_c_string(e.error().to_string()),
        None => ptr::null_mut(),
    }
}

/// The failed operation of row `idx`, e.g. `INSERT (int32 id=1)`, as a new
/// string; null when `idx` is out of range.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_row_errors_operation(
    errors: *const kestrel_row_errors,
    idx: usize,
) -> *mut c_char {
    match unsafe { row_error(errors, idx) } {
        Some(e) => into_c_string(format!("{} {}", e.kind(), e.row())),
        None => ptr::null_mut(),
    }
}
