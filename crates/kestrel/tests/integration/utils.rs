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

use kestrel::KestrelClient;
use kestrel::client::{ClientBuilder, KestrelTable, ScanBatch};
use kestrel::metadata::{DataType, Schema, SchemaBuilder};
use kestrel::server::{MiniCluster, MiniClusterConfig};
use std::sync::LazyLock;
use tokio::runtime::Runtime;

/// A mini cluster serving every test of this binary. It runs on its own
/// runtime so it outlives the per-test runtimes of `#[tokio::test]`.
pub struct SharedCluster {
    address: String,
    _cluster: MiniCluster,
    _runtime: Runtime,
}

static SHARED_CLUSTER: LazyLock<SharedCluster> = LazyLock::new(|| {
    std::thread::spawn(|| {
        let rt = Runtime::new().expect("Failed to create runtime");
        let cluster = rt
            .block_on(MiniCluster::start(MiniClusterConfig::default()))
            .expect("Failed to start mini cluster");
        SharedCluster {
            address: cluster.address(),
            _cluster: cluster,
            _runtime: rt,
        }
    })
    .join()
    .expect("Failed to initialize shared cluster")
});

pub fn shared_cluster_address() -> &'static str {
    &SHARED_CLUSTER.address
}

pub async fn connect() -> KestrelClient {
    let _ = env_logger::builder().is_test(true).try_init();
    ClientBuilder::new()
        .add_master_server_addr(shared_cluster_address())
        .build()
        .await
        .expect("Failed to connect to the shared cluster")
}

/// `(key INT32 NOT NULL, value STRING NULL)` keyed on `key`.
pub fn key_value_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .add_column("key")
        .data_type(DataType::Int32)
        .primary_key();
    builder.add_column("value").data_type(DataType::String);
    builder.build().expect("Failed to build schema")
}

pub async fn create_table(
    client: &KestrelClient,
    table_name: &str,
    schema: &Schema,
    hash_column: &str,
    num_buckets: i32,
) -> KestrelTable {
    let mut creator = client.new_table_creator();
    creator
        .table_name(table_name)
        .schema(schema)
        .add_hash_partitions([hash_column], num_buckets);
    creator.create().await.expect("Failed to create table");
    client
        .open_table(table_name)
        .await
        .expect("Failed to open table")
}

/// Every row of `table`, rendered, in scan order.
pub async fn scan_all(table: &KestrelTable) -> Vec<String> {
    let mut scanner = table.new_scanner();
    scanner.open().await.expect("Failed to open scanner");
    let mut batch = ScanBatch::default();
    let mut rows = Vec::new();
    while scanner.has_more_rows() {
        scanner
            .next_batch(&mut batch)
            .await
            .expect("Failed to fetch batch");
        rows.extend(batch.rows().map(|row| row.to_string()));
    }
    rows
}
