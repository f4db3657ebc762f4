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

use crate::metadata::DataType;
pub use crate::rpc::{ApiError, KestrelError};
use crate::rpc::RpcError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the client can report.
///
/// The `Display` output always starts with a status category such as
/// `Invalid argument` or `Not found`, followed by a description.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {message}")]
    IllegalArgument { message: String },

    #[error("Illegal state: {message}")]
    IllegalState { message: String },

    #[error("Invalid argument: invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Not found: No such column: {name}")]
    ColumnNotFound { name: String },

    #[error(
        "Invalid argument: column {column} is of type {column_type}, not {requested_type}"
    )]
    TypeMismatch {
        column: String,
        column_type: DataType,
        requested_type: DataType,
    },

    #[error("Invalid argument: column {column} is not nullable")]
    NullValue { column: String },

    #[error("Incomplete: {message}")]
    Incomplete { message: String },

    #[error("Runtime error: {failed} row(s) failed to apply; first error: {first_error}")]
    PartialWrite { failed: usize, first_error: String },

    #[error("Timed out: {message}")]
    Timeout { message: String },

    #[error(transparent)]
    RpcError(#[from] RpcError),

    #[error("{api_error}")]
    KestrelAPIError { api_error: ApiError },

    #[error("Runtime error: {message}")]
    UnexpectedError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// The server-side error kind, if this error was reported by a server.
    pub fn api_error(&self) -> Option<KestrelError> {
        match self {
            Error::KestrelAPIError { api_error } => Some(api_error.error()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.api_error(),
            Some(KestrelError::TableNotExist | KestrelError::NotFound)
        )
    }
}

impl Error {
    /// The error as reported for a single row: server errors keep their code,
    /// client-side failures are mapped onto the closest protocol code.
    pub fn to_api_error(&self) -> ApiError {
        let kind = match self {
            Error::KestrelAPIError { api_error } => return api_error.clone(),
            Error::ColumnNotFound { .. } => KestrelError::NotFound,
            Error::IllegalArgument { .. }
            | Error::InvalidSchema { .. }
            | Error::TypeMismatch { .. }
            | Error::NullValue { .. } => KestrelError::InvalidRequest,
            Error::Timeout { .. } => KestrelError::RequestTimeOut,
            Error::RpcError(_) | Error::IoError(_) => KestrelError::NetworkException,
            Error::IllegalState { .. }
            | Error::Incomplete { .. }
            | Error::PartialWrite { .. }
            | Error::UnexpectedError { .. } => KestrelError::UnknownServerError,
        };
        let text = self.to_string();
        let detail = match text.split_once(": ") {
            Some((_, detail)) => detail.to_string(),
            None => text,
        };
        ApiError::new(kind, detail)
    }
}

impl From<ApiError> for Error {
    fn from(api_error: ApiError) -> Self {
        Error::KestrelAPIError { api_error }
    }
}
