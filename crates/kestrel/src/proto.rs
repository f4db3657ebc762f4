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

//! Wire messages exchanged between the client and the masters.
//!
//! Tags are stable. New fields get new tags and must be optional or repeated.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(int32, tag = "1")]
    pub error_code: i32,
    #[prost(string, optional, tag = "2")]
    pub error_message: ::core::option::Option<::prost::alloc::string::String>,
}

// ---------------------------------------------------------------------------
// Schema and partitioning
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbColumnSchema {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub data_type: i32,
    #[prost(bool, tag = "3")]
    pub nullable: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbSchema {
    #[prost(message, repeated, tag = "1")]
    pub columns: ::prost::alloc::vec::Vec<PbColumnSchema>,
    /// Key columns are always the leading columns.
    #[prost(uint32, tag = "2")]
    pub num_key_columns: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbHashDimension {
    #[prost(string, repeated, tag = "1")]
    pub column_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(int32, tag = "2")]
    pub num_buckets: i32,
    #[prost(uint32, tag = "3")]
    pub seed: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbPartitionSchema {
    #[prost(message, repeated, tag = "1")]
    pub hash_dimensions: ::prost::alloc::vec::Vec<PbHashDimension>,
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbDatum {
    /// Unset means NULL.
    #[prost(oneof = "pb_datum::Value", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub value: ::core::option::Option<pb_datum::Value>,
}

pub mod pb_datum {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(sint32, tag = "1")]
        Int8(i32),
        #[prost(sint32, tag = "2")]
        Int16(i32),
        #[prost(sint32, tag = "3")]
        Int32(i32),
        #[prost(sint64, tag = "4")]
        Int64(i64),
        #[prost(string, tag = "5")]
        String(::prost::alloc::string::String),
        #[prost(bool, tag = "6")]
        Bool(bool),
        #[prost(float, tag = "7")]
        Float(f32),
        #[prost(double, tag = "8")]
        Double(f64),
        #[prost(bytes, tag = "9")]
        Binary(::prost::alloc::vec::Vec<u8>),
        #[prost(sint64, tag = "10")]
        UnixtimeMicros(i64),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbCell {
    #[prost(uint32, tag = "1")]
    pub column_index: u32,
    #[prost(message, optional, tag = "2")]
    pub datum: ::core::option::Option<PbDatum>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbRowOperation {
    #[prost(int32, tag = "1")]
    pub op_type: i32,
    /// Only the columns that were set.
    #[prost(message, repeated, tag = "2")]
    pub cells: ::prost::alloc::vec::Vec<PbCell>,
}

/// A row in projection order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbRow {
    #[prost(message, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<PbDatum>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbRowError {
    #[prost(uint32, tag = "1")]
    pub row_index: u32,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<ErrorResponse>,
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectToMasterRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectToMasterResponse {
    #[prost(string, tag = "1")]
    pub cluster_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub server_version: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateTableRequest {
    #[prost(string, tag = "1")]
    pub table_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub schema: ::core::option::Option<PbSchema>,
    #[prost(message, optional, tag = "3")]
    pub partition_schema: ::core::option::Option<PbPartitionSchema>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateTableResponse {
    #[prost(string, tag = "1")]
    pub table_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteTableRequest {
    #[prost(string, tag = "1")]
    pub table_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteTableResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TableExistsRequest {
    #[prost(string, tag = "1")]
    pub table_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TableExistsResponse {
    #[prost(bool, tag = "1")]
    pub exists: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableRequest {
    #[prost(string, tag = "1")]
    pub table_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableResponse {
    #[prost(string, tag = "1")]
    pub table_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub table_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub schema: ::core::option::Option<PbSchema>,
    #[prost(message, optional, tag = "4")]
    pub partition_schema: ::core::option::Option<PbPartitionSchema>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListTablesRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListTablesResponse {
    #[prost(string, repeated, tag = "1")]
    pub table_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    #[prost(string, tag = "1")]
    pub table_id: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub operations: ::prost::alloc::vec::Vec<PbRowOperation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResponse {
    /// One entry per failed operation, indexed into the request.
    #[prost(message, repeated, tag = "1")]
    pub row_errors: ::prost::alloc::vec::Vec<PbRowError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenScannerRequest {
    #[prost(string, tag = "1")]
    pub table_id: ::prost::alloc::string::String,
    #[prost(uint32, repeated, tag = "2")]
    pub projected_column_indexes: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, tag = "3")]
    pub batch_size_rows: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenScannerResponse {
    #[prost(uint64, tag = "1")]
    pub scanner_id: u64,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanNextRequest {
    #[prost(uint64, tag = "1")]
    pub scanner_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanNextResponse {
    #[prost(message, repeated, tag = "1")]
    pub rows: ::prost::alloc::vec::Vec<PbRow>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloseScannerRequest {
    #[prost(uint64, tag = "1")]
    pub scanner_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloseScannerResponse {}
