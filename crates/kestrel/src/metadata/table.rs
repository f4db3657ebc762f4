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
use crate::error::{Error, Result};
use crate::metadata::{PartitionSchema, Schema};
use crate::proto::GetTableResponse;

/// Metadata of an existing table as reported by the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    table_id: TableId,
    table_name: String,
    schema: Schema,
    partition_schema: PartitionSchema,
}

impl TableInfo {
    pub fn new(
        table_id: TableId,
        table_name: String,
        schema: Schema,
        partition_schema: PartitionSchema,
    ) -> Self {
        Self {
            table_id,
            table_name,
            schema,
            partition_schema,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn partition_schema(&self) -> &PartitionSchema {
        &self.partition_schema
    }

    pub fn from_pb(pb: GetTableResponse) -> Result<Self> {
        let schema = pb.schema.as_ref().ok_or_else(|| Error::UnexpectedError {
            message: format!("master returned table {} without a schema", pb.table_name),
            source: None,
        })?;
        Ok(Self {
            schema: Schema::from_pb(schema)?,
            partition_schema: pb
                .partition_schema
                .as_ref()
                .map(PartitionSchema::from_pb)
                .unwrap_or_default(),
            table_id: pb.table_id,
            table_name: pb.table_name,
        })
    }
}
