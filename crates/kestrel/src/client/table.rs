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

use crate::client::{KestrelClient, Scanner, WriteOperation, WriteOperationKind};
use crate::metadata::{PartitionSchema, Schema, TableInfo};
use std::sync::Arc;

/// An opened table. Cloning shares the metadata and the client.
#[derive(Debug, Clone)]
pub struct KestrelTable {
    client: KestrelClient,
    info: Arc<TableInfo>,
}

impl KestrelTable {
    pub(crate) fn new(client: KestrelClient, info: TableInfo) -> Self {
        Self {
            client,
            info: Arc::new(info),
        }
    }

    pub fn name(&self) -> &str {
        self.info.table_name()
    }

    pub fn id(&self) -> &str {
        self.info.table_id()
    }

    pub fn schema(&self) -> &Schema {
        self.info.schema()
    }

    pub fn partition_schema(&self) -> &PartitionSchema {
        self.info.partition_schema()
    }

    pub fn table_info(&self) -> &TableInfo {
        &self.info
    }

    pub fn client(&self) -> &KestrelClient {
        &self.client
    }

    pub fn new_insert(&self) -> WriteOperation {
        WriteOperation::new(WriteOperationKind::Insert, self.clone())
    }

    pub fn new_update(&self) -> WriteOperation {
        WriteOperation::new(WriteOperationKind::Update, self.clone())
    }

    pub fn new_upsert(&self) -> WriteOperation {
        WriteOperation::new(WriteOperationKind::Upsert, self.clone())
    }

    pub fn new_delete(&self) -> WriteOperation {
        WriteOperation::new(WriteOperationKind::Delete, self.clone())
    }

    pub fn new_scanner(&self) -> Scanner {
        Scanner::new(self)
    }
}
