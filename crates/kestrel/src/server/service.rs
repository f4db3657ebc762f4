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

use crate::ScannerId;
use crate::metadata::{PartitionSchema, Schema};
use crate::proto::{
    CloseScannerRequest, CloseScannerResponse, ConnectToMasterRequest, ConnectToMasterResponse,
    CreateTableRequest, CreateTableResponse, DeleteTableRequest, DeleteTableResponse,
    ErrorResponse, GetTableRequest, GetTableResponse, ListTablesRequest, ListTablesResponse,
    OpenScannerRequest, OpenScannerResponse, PbRow, PbRowError, ScanNextRequest,
    ScanNextResponse, TableExistsRequest, TableExistsResponse, WriteRequest, WriteResponse,
};
use crate::row::Datum;
use crate::rpc::message::RequestHeader;
use crate::rpc::{ApiError, ApiKey, KestrelError};
use crate::server::catalog::Catalog;
use dashmap::DashMap;
use log::debug;
use prost::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Rows an open scanner has not returned yet.
#[derive(Debug)]
struct ScanCursor {
    rows: VecDeque<Vec<Datum>>,
    batch_size_rows: usize,
}

/// Executes decoded requests against the in-memory catalog.
#[derive(Debug)]
pub(crate) struct KestrelService {
    cluster_id: String,
    catalog: Catalog,
    scanners: DashMap<ScannerId, ScanCursor>,
    next_scanner_id: AtomicU64,
    default_scan_batch_size_rows: u32,
}

fn decode<M: Message + Default>(body: &[u8]) -> Result<M, ApiError> {
    M::decode(body).map_err(|e| ApiError::new(KestrelError::CorruptMessage, e.to_string()))
}

impl KestrelService {
    pub(crate) fn new(cluster_id: String, default_scan_batch_size_rows: u32) -> Self {
        Self {
            cluster_id,
            catalog: Catalog::default(),
            scanners: DashMap::new(),
            next_scanner_id: AtomicU64::new(1),
            default_scan_batch_size_rows: default_scan_batch_size_rows.max(1),
        }
    }

    /// Handles one request and returns the encoded response body.
    pub(crate) fn handle(&self, header: &RequestHeader, body: &[u8]) -> Result<Vec<u8>, ApiError> {
        let response = match header.request_api_key {
            ApiKey::ConnectToMaster => self.connect_to_master(decode(body)?).encode_to_vec(),
            ApiKey::CreateTable => self.create_table(decode(body)?)?.encode_to_vec(),
            ApiKey::DeleteTable => self.delete_table(decode(body)?)?.encode_to_vec(),
            ApiKey::TableExists => self.table_exists(decode(body)?).encode_to_vec(),
            ApiKey::GetTable => self.get_table(decode(body)?)?.encode_to_vec(),
            ApiKey::ListTables => self.list_tables(decode(body)?).encode_to_vec(),
            ApiKey::Write => self.write(decode(body)?)?.encode_to_vec(),
            ApiKey::OpenScanner => self.open_scanner(decode(body)?)?.encode_to_vec(),
            ApiKey::ScanNext => self.scan_next(decode(body)?)?.encode_to_vec(),
            ApiKey::CloseScanner => self.close_scanner(decode(body)?)?.encode_to_vec(),
            ApiKey::Unknown(key) => {
                return Err(ApiError::new(
                    KestrelError::InvalidRequest,
                    format!("unsupported api key {key}"),
                ));
            }
        };
        Ok(response)
    }

    fn connect_to_master(&self, _request: ConnectToMasterRequest) -> ConnectToMasterResponse {
        ConnectToMasterResponse {
            cluster_id: self.cluster_id.clone(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn create_table(&self, request: CreateTableRequest) -> Result<CreateTableResponse, ApiError> {
        let schema = request.schema.as_ref().ok_or_else(|| {
            ApiError::new(KestrelError::InvalidTableException, "schema is missing")
        })?;
        let schema = Schema::from_pb(schema).map_err(|e| {
            ApiError::new(KestrelError::InvalidTableException, e.to_api_error().message)
        })?;
        let partition_schema = request
            .partition_schema
            .as_ref()
            .map(PartitionSchema::from_pb)
            .unwrap_or_default();
        let table = self
            .catalog
            .create_table(&request.table_name, schema, partition_schema)?;
        Ok(CreateTableResponse {
            table_id: table.id().to_string(),
        })
    }

    fn delete_table(&self, request: DeleteTableRequest) -> Result<DeleteTableResponse, ApiError> {
        self.catalog.delete_table(&request.table_name)?;
        Ok(DeleteTableResponse {})
    }

    fn table_exists(&self, request: TableExistsRequest) -> TableExistsResponse {
        TableExistsResponse {
            exists: self.catalog.table_exists(&request.table_name),
        }
    }

    fn get_table(&self, request: GetTableRequest) -> Result<GetTableResponse, ApiError> {
        let table = self.catalog.table_by_name(&request.table_name)?;
        Ok(GetTableResponse {
            table_id: table.id().to_string(),
            table_name: table.name().to_string(),
            schema: Some(table.schema().to_pb()),
            partition_schema: Some(table.partition_schema().to_pb()),
        })
    }

    fn list_tables(&self, _request: ListTablesRequest) -> ListTablesResponse {
        ListTablesResponse {
            table_names: self.catalog.table_names(),
        }
    }

    /// Applies every operation independently; failures are reported per row.
    fn write(&self, request: WriteRequest) -> Result<WriteResponse, ApiError> {
        let table = self.catalog.table_by_id(&request.table_id)?;
        let row_errors = request
            .operations
            .into_iter()
            .enumerate()
            .filter_map(|(row_index, operation)| {
                table.apply(operation).err().map(|error| PbRowError {
                    row_index: row_index as u32,
                    error: Some(ErrorResponse::from(&error)),
                })
            })
            .collect();
        Ok(WriteResponse { row_errors })
    }

    fn open_scanner(&self, request: OpenScannerRequest) -> Result<OpenScannerResponse, ApiError> {
        let table = self.catalog.table_by_id(&request.table_id)?;
        let num_columns = table.schema().num_columns();
        let projection = request
            .projected_column_indexes
            .iter()
            .map(|idx| {
                let idx = *idx as usize;
                if idx < num_columns {
                    Ok(idx)
                } else {
                    Err(ApiError::new(
                        KestrelError::InvalidRequest,
                        format!(
                            "projected column index {idx} out of range for {num_columns} columns"
                        ),
                    ))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows: VecDeque<_> = table.snapshot(&projection).into();
        let batch_size_rows = match request.batch_size_rows {
            0 => self.default_scan_batch_size_rows,
            n => n,
        } as usize;
        let has_more = !rows.is_empty();
        let scanner_id = self.next_scanner_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Opened scanner {scanner_id} on table {} with {} row(s)",
            table.name(),
            rows.len()
        );
        if has_more {
            self.scanners.insert(
                scanner_id,
                ScanCursor {
                    rows,
                    batch_size_rows,
                },
            );
        }
        Ok(OpenScannerResponse {
            scanner_id,
            has_more,
        })
    }

    fn scan_next(&self, request: ScanNextRequest) -> Result<ScanNextResponse, ApiError> {
        let (rows, has_more) = {
            let mut cursor = self
                .scanners
                .get_mut(&request.scanner_id)
                .ok_or_else(|| scanner_not_found(request.scanner_id))?;
            let take = cursor.batch_size_rows.min(cursor.rows.len());
            let rows: Vec<PbRow> = cursor
                .rows
                .drain(..take)
                .map(|values| PbRow {
                    values: values.iter().map(Datum::to_pb).collect(),
                })
                .collect();
            (rows, !cursor.rows.is_empty())
        };
        if !has_more {
            self.scanners.remove(&request.scanner_id);
            debug!("Scanner {} exhausted", request.scanner_id);
        }
        Ok(ScanNextResponse { rows, has_more })
    }

    fn close_scanner(
        &self,
        request: CloseScannerRequest,
    ) -> Result<CloseScannerResponse, ApiError> {
        self.scanners
            .remove(&request.scanner_id)
            .ok_or_else(|| scanner_not_found(request.scanner_id))?;
        debug!("Closed scanner {}", request.scanner_id);
        Ok(CloseScannerResponse {})
    }

    pub(crate) fn num_open_scanners(&self) -> usize {
        self.scanners.len()
    }
}

fn scanner_not_found(scanner_id: ScannerId) -> ApiError {
    ApiError::new(
        KestrelError::ScannerNotFound,
        format!("scanner {scanner_id} not found"),
    )
}
