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

use crate::rpc::api_key::ApiKey;
use crate::rpc::api_version::ApiVersion;
use crate::rpc::frame::{ReadError, WriteError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Network error: cannot connect: {0}")]
    ConnectionError(String),

    #[error("Network error: cannot write message: {0}")]
    WriteMessageError(#[from] WriteError),

    #[error("Network error: cannot read message: {0}")]
    ReadMessageError(#[from] ReadError),

    #[error("Network error: connection is poisoned: {0}")]
    Poisoned(Arc<RpcError>),

    #[error(
        "Corruption: response of {api_key:?} (version {api_version:?}) \
         has {message_size} bytes but only {read} were read"
    )]
    TooMuchData {
        message_size: u64,
        read: u64,
        api_key: ApiKey,
        api_version: ApiVersion,
    },
}
