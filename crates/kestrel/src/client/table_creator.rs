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

use crate::client::KestrelClient;
use crate::error::{Error, Result};
use crate::metadata::{HashDimension, PartitionSchema, Schema};
use crate::rpc::message::CreateTableRequest;
use log::info;

/// Describes a table to create. Settings are chained on `&mut self`;
/// [`create`](Self::create) consumes the creator.
#[derive(Debug)]
pub struct TableCreator {
    client: KestrelClient,
    table_name: Option<String>,
    schema: Option<Schema>,
    hash_dimensions: Vec<HashDimension>,
}

impl TableCreator {
    pub(crate) fn new(client: KestrelClient) -> Self {
        Self {
            client,
            table_name: None,
            schema: None,
            hash_dimensions: Vec::new(),
        }
    }

    pub fn table_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table_name = Some(name.into());
        self
    }

    /// Uses a copy of `schema`; the caller keeps its own.
    pub fn schema(&mut self, schema: &Schema) -> &mut Self {
        self.schema = Some(schema.clone());
        self
    }

    /// Adds a hash dimension over `columns`. Each call adds one dimension;
    /// the table gets one tablet per combination of buckets.
    pub fn add_hash_partitions<I, S>(&mut self, columns: I, num_buckets: i32) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hash_dimensions.push(HashDimension::new(
            columns.into_iter().map(Into::into).collect(),
            num_buckets,
        ));
        self
    }

    fn validate(&self) -> Result<(&str, &Schema, PartitionSchema)> {
        let table_name = match self.table_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            Some(_) => {
                return Err(Error::IllegalArgument {
                    message: "table name must not be empty".to_string(),
                });
            }
            None => {
                return Err(Error::IllegalArgument {
                    message: "missing table name".to_string(),
                });
            }
        };
        let schema = self.schema.as_ref().ok_or_else(|| Error::IllegalArgument {
            message: "missing schema".to_string(),
        })?;
        let partition_schema = PartitionSchema::new(self.hash_dimensions.clone());
        partition_schema.validate(schema)?;
        Ok((table_name, schema, partition_schema))
    }

    pub async fn create(self) -> Result<()> {
        let (table_name, schema, partition_schema) = self.validate()?;
        let response = self
            .client
            .request(CreateTableRequest::new(
                table_name,
                schema,
                &partition_schema,
            ))
            .await?;
        info!(
            "Created table {table_name} ({}), partitioned by {partition_schema}",
            response.table_id
        );
        Ok(())
    }
}
