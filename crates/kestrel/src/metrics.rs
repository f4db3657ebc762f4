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

//! Metric names emitted by the client.
//!
//! Library code only talks to the [`metrics`] facade. Nothing is recorded
//! unless the application installs a recorder.

use crate::rpc::ApiKey;

pub const LABEL_API_KEY: &str = "api_key";

pub const CLIENT_REQUESTS_TOTAL: &str = "kestrel.client.requests.total";
pub const CLIENT_RESPONSES_TOTAL: &str = "kestrel.client.responses.total";
pub const CLIENT_BYTES_SENT_TOTAL: &str = "kestrel.client.bytes_sent.total";
pub const CLIENT_BYTES_RECEIVED_TOTAL: &str = "kestrel.client.bytes_received.total";
pub const CLIENT_REQUEST_LATENCY_MS: &str = "kestrel.client.request_latency_ms";
pub const CLIENT_REQUESTS_IN_FLIGHT: &str = "kestrel.client.requests_in_flight";

pub const SESSION_ROWS_FAILED_TOTAL: &str = "kestrel.client.session.rows_failed.total";

/// Label for data-path api keys. DDL and metadata calls are not reported.
pub(crate) fn api_key_label(api_key: ApiKey) -> Option<&'static str> {
    match api_key {
        ApiKey::Write => Some("write"),
        ApiKey::OpenScanner => Some("open_scanner"),
        ApiKey::ScanNext => Some("scan_next"),
        _ => None,
    }
}
