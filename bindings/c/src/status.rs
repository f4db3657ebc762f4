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

use kestrel::error::Error;
use std::ffi::c_char;
use std::ptr;

use crate::types::into_c_string;

/// Code of errors raised on the client side rather than reported by a server.
/// It lies outside the range of protocol error codes.
pub const CLIENT_ERROR_CODE: i32 = -2;

/// The outcome of a failed call. Success is a null status and never allocates.
#[derive(Debug)]
pub struct kestrel_status {
    code: i32,
    message: String,
}

impl kestrel_status {
    pub(crate) fn client(message: impl Into<String>) -> Self {
        Self {
            code: CLIENT_ERROR_CODE,
            message: message.into(),
        }
    }

    pub(crate) fn illegal_state(message: &str) -> Self {
        Self::client(format!("Illegal state: {message}"))
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Server errors keep their protocol code; everything else is a client error.
impl From<Error> for kestrel_status {
    fn from(error: Error) -> Self {
        let code = match &error {
            Error::KestrelAPIError { api_error } => api_error.code,
            _ => CLIENT_ERROR_CODE,
        };
        Self {
            code,
            message: error.to_string(),
        }
    }
}

/// Argument conversion failures from the binding layer itself.
impl From<anyhow::Error> for kestrel_status {
    fn from(error: anyhow::Error) -> Self {
        Self::client(format!("Invalid argument: {error}"))
    }
}

pub(crate) type BridgeResult<T> = Result<T, kestrel_status>;

/// Null on success, a new status otherwise.
pub(crate) fn into_status(result: BridgeResult<()>) -> *mut kestrel_status {
    match result {
        Ok(()) => ptr::null_mut(),
        Err(status) => {
            log::debug!("Returning error status {}: {}", status.code, status.message);
            Box::into_raw(Box::new(status))
        }
    }
}

/// Runs a bridge call body and turns its outcome into a status.
pub(crate) fn with_status(call: impl FnOnce() -> BridgeResult<()>) -> *mut kestrel_status {
    into_status(call())
}

/// The status message as a new C string; free it with [`kestrel_string_free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_status_message(status: *const kestrel_status) -> *mut c_char {
    match unsafe { status.as_ref() } {
        Some(status) => into_c_string(status.message.clone()),
        None => ptr::null_mut(),
    }
}

/// The protocol error code, or [`CLIENT_ERROR_CODE`]. A null status is 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_status_code(status: *const kestrel_status) -> i32 {
    unsafe { status.as_ref() }.map_or(0, |s| s.code)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_status_free(status: *mut kestrel_status) {
    if !status.is_null() {
        drop(unsafe { Box::from_raw(status) });
    }
}
