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

use crate::TableId;
use crate::client::WriteOperationKind;
use crate::metadata::{PartitionSchema, Schema};
use crate::proto::PbRowOperation;
use crate::rpc::{ApiError, KestrelError};
use crate::row::{Datum, KeyEncoder, PartialRow};
use log::info;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Rows of one tablet, ordered by encoded primary key.
type Tablet = BTreeMap<Vec<u8>, Vec<Datum>>;

#[derive(Debug)]
pub(crate) struct TableState {
    id: TableId,
    name: String,
    schema: Schema,
    partition_schema: PartitionSchema,
    tablets: Vec<Mutex<Tablet>>,
}

impl TableState {
    fn new(id: TableId, name: String, schema: Schema, partition_schema: PartitionSchema) -> Self {
        let tablets = (0..partition_schema.num_tablets())
            .map(|_| Mutex::new(Tablet::new()))
            .collect();
        Self {
            id,
            name,
            schema,
            partition_schema,
            tablets,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn partition_schema(&self) -> &PartitionSchema {
        &self.partition_schema
    }

    /// Applies one row operation to the tablet owning its key.
    pub(crate) fn apply(&self, operation: PbRowOperation) -> Result<(), ApiError> {
        let kind = WriteOperationKind::from_i32(operation.op_type).ok_or_else(|| {
            ApiError::new(
                KestrelError::InvalidRequest,
                format!("unknown operation type {}", operation.op_type),
            )
        })?;
        let row = PartialRow::from_cells(self.schema.clone(), operation.cells)
            .map_err(|e| e.to_api_error())?;

        let missing = row.missing_columns(matches!(
            kind,
            WriteOperationKind::Insert | WriteOperationKind::Upsert
        ));
        if !missing.is_empty() {
            return Err(ApiError::new(
                KestrelError::InvalidRequest,
                format!("row {row} is missing required column(s): {}", missing.join(", ")),
            ));
        }

        let assigned: Vec<(usize, Datum)> = (0..self.schema.num_columns())
            .filter_map(|idx| row.get(idx).map(|datum| (idx, datum.clone())))
            .collect();
        let values = row.into_values();
        let key = KeyEncoder::encode(&values, &self.schema.primary_key_indexes())
            .map_err(|e| e.to_api_error())?;
        let tablet_id = self
            .partition_schema
            .tablet_for_row(&self.schema, &values)
            .map_err(|e| e.to_api_error())?;
        let tablet = self.tablets.get(tablet_id).ok_or_else(|| {
            ApiError::new(
                KestrelError::UnknownServerError,
                format!("tablet {tablet_id} out of range"),
            )
        })?;

        let mut tablet = tablet.lock();
        match kind {
            WriteOperationKind::Insert => {
                if tablet.contains_key(&key) {
                    return Err(ApiError::new(
                        KestrelError::AlreadyPresent,
                        "key already present",
                    ));
                }
                tablet.insert(key, values);
            }
            WriteOperationKind::Upsert => match tablet.get_mut(&key) {
                Some(existing) => merge(existing, assigned),
                None => {
                    tablet.insert(key, values);
                }
            },
            WriteOperationKind::Update => match tablet.get_mut(&key) {
                Some(existing) => merge(existing, assigned),
                None => return Err(ApiError::new(KestrelError::NotFound, "key not found")),
            },
            WriteOperationKind::Delete => {
                if tablet.remove(&key).is_none() {
                    return Err(ApiError::new(KestrelError::NotFound, "key not found"));
                }
            }
        }
        Ok(())
    }

    /// Copies the projected columns of every row, tablet by tablet in key order.
    pub(crate) fn snapshot(&self, projection: &[usize]) -> Vec<Vec<Datum>> {
        let mut rows = Vec::new();
        for tablet in &self.tablets {
            let tablet = tablet.lock();
            rows.extend(
                tablet
                    .values()
                    .map(|row| projection.iter().map(|idx| row[*idx].clone()).collect()),
            );
        }
        rows
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.tablets.iter().map(|t| t.lock().len()).sum()
    }
}

fn merge(existing: &mut [Datum], assigned: Vec<(usize, Datum)>) {
    for (idx, datum) in assigned {
        existing[idx] = datum;
    }
}

#[derive(Debug, Default)]
struct Tables {
    by_name: HashMap<String, Arc<TableState>>,
    by_id: HashMap<TableId, Arc<TableState>>,
}

/// All tables known to the mini cluster.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    tables: RwLock<Tables>,
    next_table_id: AtomicU64,
}

impl Catalog {
    pub(crate) fn create_table(
        &self,
        name: &str,
        schema: Schema,
        partition_schema: PartitionSchema,
    ) -> Result<Arc<TableState>, ApiError> {
        if name.is_empty() {
            return Err(ApiError::new(
                KestrelError::InvalidTableException,
                "table name must not be empty",
            ));
        }
        partition_schema.validate(&schema).map_err(|e| {
            let ApiError { message, .. } = e.to_api_error();
            ApiError::new(KestrelError::InvalidTableException, message)
        })?;

        let mut tables = self.tables.write();
        if tables.by_name.contains_key(name) {
            return Err(ApiError::new(
                KestrelError::TableAlreadyExist,
                format!("table {name} already exists"),
            ));
        }
        let id = format!(
            "{:032x}",
            self.next_table_id.fetch_add(1, Ordering::Relaxed) + 1
        );
        let table = Arc::new(TableState::new(
            id.clone(),
            name.to_string(),
            schema,
            partition_schema,
        ));
        tables.by_name.insert(name.to_string(), Arc::clone(&table));
        tables.by_id.insert(id, Arc::clone(&table));
        info!(
            "Created table {name} ({}) with {} tablet(s)",
            table.id,
            table.tablets.len()
        );
        Ok(table)
    }

    pub(crate) fn delete_table(&self, name: &str) -> Result<(), ApiError> {
        let mut tables = self.tables.write();
        let table = tables
            .by_name
            .remove(name)
            .ok_or_else(|| table_not_found(name))?;
        tables.by_id.remove(&table.id);
        info!("Deleted table {name} ({})", table.id);
        Ok(())
    }

    pub(crate) fn table_by_name(&self, name: &str) -> Result<Arc<TableState>, ApiError> {
        self.tables
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| table_not_found(name))
    }

    pub(crate) fn table_by_id(&self, id: &str) -> Result<Arc<TableState>, ApiError> {
        self.tables.read().by_id.get(id).cloned().ok_or_else(|| {
            ApiError::new(
                KestrelError::TableNotExist,
                format!("table with id {id} does not exist"),
            )
        })
    }

    pub(crate) fn table_exists(&self, name: &str) -> bool {
        self.tables.read().by_name.contains_key(name)
    }

    pub(crate) fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }
}

fn table_not_found(name: &str) -> ApiError {
    ApiError::new(
        KestrelError::TableNotExist,
        format!("table {name} does not exist"),
    )
}
