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
use crate::rpc::api_key::ApiKey;
use crate::rpc::api_version::ApiVersion;
use crate::rpc::frame::{ReadError, WriteError};
use bytes::{Buf, BufMut};
use prost::Message;
use std::io::Cursor;

mod close_scanner;
mod connect_to_master;
mod create_table;
mod delete_table;
mod get_table;
mod list_tables;
mod open_scanner;
mod scan_next;
mod table_exists;
mod write;

pub use close_scanner::*;
pub use connect_to_master::*;
pub use create_table::*;
pub use delete_table::*;
pub use get_table::*;
pub use list_tables::*;
pub use open_scanner::*;
pub use scan_next::*;
pub use table_exists::*;
pub use write::*;

const RESPONSE_TYPE_SUCCESS: u8 = 0;
const RESPONSE_TYPE_ERROR: u8 = 1;

pub trait RequestBody {
    type ResponseBody;

    const API_KEY: ApiKey;

    const REQUEST_VERSION: ApiVersion;
}

pub trait WriteVersionedType<W>: Sized {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError>;
}

pub trait ReadVersionedType<R>: Sized {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError>;
}

/// Request header: `api_key: i16, api_version: i16, request_id: i32`, big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub request_api_key: ApiKey,
    pub request_api_version: ApiVersion,
    pub request_id: i32,
}

impl WriteVersionedType<Vec<u8>> for RequestHeader {
    fn write_versioned(
        &self,
        writer: &mut Vec<u8>,
        _version: ApiVersion,
    ) -> Result<(), WriteError> {
        writer.put_i16(self.request_api_key.into());
        writer.put_i16(self.request_api_version.0);
        writer.put_i32(self.request_id);
        Ok(())
    }
}

impl ReadVersionedType<Cursor<Vec<u8>>> for RequestHeader {
    fn read_versioned(
        reader: &mut Cursor<Vec<u8>>,
        _version: ApiVersion,
    ) -> Result<Self, ReadError> {
        if reader.remaining() < 8 {
            return Err(ReadError::Malformed(format!(
                "request header needs 8 bytes, got {}",
                reader.remaining()
            )));
        }
        Ok(RequestHeader {
            request_api_key: ApiKey::from(reader.get_i16()),
            request_api_version: ApiVersion(reader.get_i16()),
            request_id: reader.get_i32(),
        })
    }
}

/// Response header: `response_type: u8, request_id: i32`. An error response
/// carries an encoded [`ErrorResponse`] instead of a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub request_id: i32,
    pub error_response: Option<ErrorResponse>,
}

impl WriteVersionedType<Vec<u8>> for ResponseHeader {
    fn write_versioned(
        &self,
        writer: &mut Vec<u8>,
        _version: ApiVersion,
    ) -> Result<(), WriteError> {
        match &self.error_response {
            None => {
                writer.put_u8(RESPONSE_TYPE_SUCCESS);
                writer.put_i32(self.request_id);
            }
            Some(error) => {
                writer.put_u8(RESPONSE_TYPE_ERROR);
                writer.put_i32(self.request_id);
                error.encode(writer)?;
            }
        }
        Ok(())
    }
}

impl ReadVersionedType<Cursor<Vec<u8>>> for ResponseHeader {
    fn read_versioned(
        reader: &mut Cursor<Vec<u8>>,
        _version: ApiVersion,
    ) -> Result<Self, ReadError> {
        if reader.remaining() < 5 {
            return Err(ReadError::Malformed(format!(
                "response header needs 5 bytes, got {}",
                reader.remaining()
            )));
        }
        let response_type = reader.get_u8();
        let request_id = reader.get_i32();
        let error_response = match response_type {
            RESPONSE_TYPE_SUCCESS => None,
            RESPONSE_TYPE_ERROR => Some(ErrorResponse::read_versioned(reader, ApiVersion(0))?),
            other => {
                return Err(ReadError::Malformed(format!(
                    "unknown response type {other}"
                )));
            }
        };
        Ok(ResponseHeader {
            request_id,
            error_response,
        })
    }
}

#[macro_export]
macro_rules! impl_write_version_type {
    ($type:ty) => {
        impl WriteVersionedType<Vec<u8>> for $type {
            fn write_versioned(
                &self,
                writer: &mut Vec<u8>,
                _version: ApiVersion,
            ) -> Result<(), WriteError> {
                Ok(self.inner_request.encode(writer)?)
            }
        }
    };
}

#[macro_export]
macro_rules! impl_read_version_type {
    ($type:ty) => {
        impl ReadVersionedType<std::io::Cursor<Vec<u8>>> for $type {
            fn read_versioned(
                reader: &mut std::io::Cursor<Vec<u8>>,
                _version: ApiVersion,
            ) -> Result<Self, ReadError> {
                let position = (reader.position() as usize).min(reader.get_ref().len());
                let message = <$type>::decode(&reader.get_ref()[position..])?;
                reader.set_position(reader.get_ref().len() as u64);
                Ok(message)
            }
        }
    };
}

impl_read_version_type!(ErrorResponse);
