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

use clap::Parser;
use kestrel::client::{ClientBuilder, FlushMode, ScanBatch};
use kestrel::config::Config;
use kestrel::error::Result;
use kestrel::metadata::{DataType, SchemaBuilder};
use kestrel::server::{MiniCluster, MiniClusterConfig};

const TABLE_NAME: &str = "example_users";

/// Runs against the masters given with `--master`, or against an in-process
/// mini cluster when none is given.
#[tokio::main]
pub async fn main() -> Result<()> {
    env_logger::init();
    let config = Config::parse();

    let local_cluster = if config.master_addresses.is_empty() {
        Some(MiniCluster::start(MiniClusterConfig::default()).await?)
    } else {
        None
    };
    let mut builder = ClientBuilder::from_config(config);
    if let Some(cluster) = &local_cluster {
        builder = builder.add_master_server_addr(cluster.address());
    }
    let client = builder.build().await?;

    let mut schema = SchemaBuilder::new();
    schema
        .add_column("id")
        .data_type(DataType::Int32)
        .primary_key();
    schema.add_column("name").data_type(DataType::String);
    schema.add_column("score").data_type(DataType::Double);
    schema
        .add_column("joined_at")
        .data_type(DataType::UnixtimeMicros);
    let schema = schema.build()?;

    if client.table_exists(TABLE_NAME).await? {
        client.delete_table(TABLE_NAME).await?;
    }
    let mut creator = client.new_table_creator();
    creator
        .table_name(TABLE_NAME)
        .schema(&schema)
        .add_hash_partitions(["id"], 4);
    creator.create().await?;

    let table = client.open_table(TABLE_NAME).await?;
    println!(
        "Created table {} ({}):\n{}",
        table.name(),
        table.partition_schema(),
        table.schema()
    );

    let mut session = client.new_session();
    session.set_flush_mode(FlushMode::ManualFlush)?;
    for (id, name) in [(1, "ada"), (2, "grace"), (3, "edsger")] {
        let mut insert = table.new_insert();
        let row = insert.row_mut();
        row.set_int32("id", id)?;
        row.set_string("name", name)?;
        row.set_double("score", f64::from(id) * 1.5)?;
        row.set_unixtime_micros("joined_at", 1_700_000_000_000_000 + i64::from(id))?;
        session.apply(insert).await?;
    }
    session.flush().await?;

    let mut update = table.new_update();
    update.row_mut().set_int32("id", 2)?;
    update.row_mut().set_null("score")?;
    session.apply(update).await?;
    session.flush().await?;
    session.close()?;

    let mut scanner = table.new_scanner();
    scanner.set_projected_columns(["id", "name", "score"])?;
    scanner.open().await?;
    let mut batch = ScanBatch::default();
    while scanner.has_more_rows() {
        scanner.next_batch(&mut batch).await?;
        for row in batch.rows() {
            println!("{row}");
        }
    }
    scanner.close().await?;

    client.delete_table(TABLE_NAME).await?;
    if let Some(cluster) = local_cluster {
        cluster.shutdown().await?;
    }
    Ok(())
}
