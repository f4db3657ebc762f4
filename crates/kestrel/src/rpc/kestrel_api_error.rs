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

use crate::proto::ErrorResponse;
use std::fmt::{Debug, Display, Formatter};

/// An error reported by a server, carried across the wire as an [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(error: KestrelError, message: impl Into<String>) -> Self {
        ApiError {
            code: error.code(),
            message: message.into(),
        }
    }

    pub fn error(&self) -> KestrelError {
        KestrelError::for_code(self.code)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = self.error();
        if self.message.is_empty() {
            write!(f, "{}: {}", kind.category(), kind.message())
        } else {
            write!(f, "{}: {}", kind.category(), self.message)
        }
    }
}

impl From<ErrorResponse> for ApiError {
    fn from(value: ErrorResponse) -> Self {
        let error = KestrelError::for_code(value.error_code);
        ApiError {
            code: value.error_code,
            message: value
                .error_message
                .unwrap_or_else(|| error.message().to_string()),
        }
    }
}

impl From<&ApiError> for ErrorResponse {
    fn from(value: &ApiError) -> Self {
        ErrorResponse {
            error_code: value.code,
            error_message: Some(value.message.clone()),
        }
    }
}

/// Error codes shared by the client and the server.
///
/// Codes are part of the wire protocol and never change meaning. Unknown codes
/// received from a newer server map to [`KestrelError::UnknownServerError`].
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KestrelError {
    /// The server experienced an unexpected error when processing the request.
    UnknownServerError = -1,
    /// No error.
    None = 0,
    /// The server disconnected before a response was received.
    NetworkException = 1,
    /// The request could not be decoded.
    CorruptMessage = 2,
    /// The request is malformed or carries invalid arguments.
    InvalidRequest = 3,
    /// The table does not exist.
    TableNotExist = 4,
    /// The table already exists.
    TableAlreadyExist = 5,
    /// The table definition (schema or partitioning) is invalid.
    InvalidTableException = 6,
    /// A row with the same primary key already exists.
    AlreadyPresent = 7,
    /// No row with the given primary key exists.
    NotFound = 8,
    /// The scanner does not exist or has already been closed.
    ScannerNotFound = 9,
    /// The row does not match the table schema.
    SchemaMismatch = 10,
    /// The request timed out.
    RequestTimeOut = 11,
}

impl KestrelError {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn for_code(code: i32) -> Self {
        match code {
            0 => KestrelError::None,
            1 => KestrelError::NetworkException,
            2 => KestrelError::CorruptMessage,
            3 => KestrelError::InvalidRequest,
            4 => KestrelError::TableNotExist,
            5 => KestrelError::TableAlreadyExist,
            6 => KestrelError::InvalidTableException,
            7 => KestrelError::AlreadyPresent,
            8 => KestrelError::NotFound,
            9 => KestrelError::ScannerNotFound,
            10 => KestrelError::SchemaMismatch,
            11 => KestrelError::RequestTimeOut,
            _ => KestrelError::UnknownServerError,
        }
    }

    /// Default message used when the server did not send one.
    pub fn message(&self) -> &'static str {
        match self {
            KestrelError::UnknownServerError => {
                "The server experienced an unexpected error when processing the request."
            }
            KestrelError::None => "No error.",
            KestrelError::NetworkException => {
                "The server disconnected before a response was received."
            }
            KestrelError::CorruptMessage => "The request could not be decoded.",
            KestrelError::InvalidRequest => "The request is invalid.",
            KestrelError::TableNotExist => "The table does not exist.",
            KestrelError::TableAlreadyExist => "The table already exists.",
            KestrelError::InvalidTableException => "The table definition is invalid.",
            KestrelError::AlreadyPresent => "A row with the same primary key already exists.",
            KestrelError::NotFound => "No row with the given primary key exists.",
            KestrelError::ScannerNotFound => "The scanner does not exist.",
            KestrelError::SchemaMismatch => "The row does not match the table schema.",
            KestrelError::RequestTimeOut => "The request timed out.",
        }
    }

    /// Short status category, used as the message prefix.
    pub fn category(&self) -> &'static str {
        match self {
            KestrelError::None => "OK",
            KestrelError::NetworkException => "Network error",
            KestrelError::CorruptMessage => "Corruption",
            KestrelError::InvalidRequest
            | KestrelError::InvalidTableException
            | KestrelError::SchemaMismatch => "Invalid argument",
            KestrelError::TableNotExist
            | KestrelError::NotFound
            | KestrelError::ScannerNotFound => "Not found",
            KestrelError::TableAlreadyExist | KestrelError::AlreadyPresent => "Already present",
            KestrelError::RequestTimeOut => "Timed out",
            KestrelError::UnknownServerError => "Runtime error",
        }
    }

    pub fn to_api_error(&self, message: Option<String>) -> ApiError {
        ApiError {
            code: self.code(),
            message: message.unwrap_or_else(|| self.message().to_string()),
        }
    }
}

impl Display for KestrelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
