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

//! Rust client for Kestrel, a distributed table storage system.
//!
//! The entry point is [`client::ClientBuilder`]. A built [`client::KestrelClient`]
//! creates and opens tables, hands out write [`client::Session`]s and builds
//! [`client::Scanner`]s.
//!
//! ```rust,no_run
//! use kestrel::client::{ClientBuilder, FlushMode, ScanBatch};
//! use kestrel::metadata::{DataType, SchemaBuilder};
//!
//! # async fn run() -> kestrel::error::Result<()> {
//! let client = ClientBuilder::new()
//!     .add_master_server_addr("127.0.0.1:7051")
//!     .build()
//!     .await?;
//!
//! let mut builder = SchemaBuilder::new();
//! builder.add_column("id").data_type(DataType::Int32).not_null();
//! builder.add_column("name").data_type(DataType::String);
//! builder.set_primary_key(["id"]);
//! let schema = builder.build()?;
//!
//! let mut creator = client.new_table_creator();
//! creator
//!     .table_name("users")
//!     .schema(&schema)
//!     .add_hash_partitions(["id"], 2);
//! creator.create().await?;
//!
//! let table = client.open_table("users").await?;
//! let mut session = client.new_session();
//! session.set_flush_mode(FlushMode::ManualFlush)?;
//! let mut insert = table.new_insert();
//! insert.row_mut().set_int32("id", 1)?;
//! insert.row_mut().set_string("name", "alice")?;
//! session.apply(insert).await?;
//! session.flush().await?;
//!
//! let mut scanner = table.new_scanner();
//! scanner.open().await?;
//! let mut batch = ScanBatch::default();
//! while scanner.has_more_rows() {
//!     scanner.next_batch(&mut batch).await?;
//!     for row in batch.rows() {
//!         println!("{row}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod proto;
pub mod row;
pub mod rpc;
pub mod server;
mod util;

pub use client::{ClientBuilder, KestrelClient};
pub use error::{Error, Result};

pub type TableId = String;
pub type ScannerId = u64;
pub type TabletId = usize;
