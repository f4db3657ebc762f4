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
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Master addresses (`host:port`), tried in order when connecting
    #[arg(long = "master", value_delimiter = ',')]
    #[serde(default)]
    pub master_addresses: Vec<String>,

    /// Timeout for establishing a TCP connection to a master
    #[arg(long, default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Timeout for a single request, including the wait for its response
    #[arg(long, default_value_t = 30_000)]
    pub rpc_timeout_ms: u64,

    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub request_max_size: usize,

    /// Maximum number of operations a session buffers before applying more fails
    /// (manual flush) or a background flush starts (background flush)
    #[arg(long, default_value_t = 1000)]
    pub mutation_buffer_max_ops: usize,

    /// Interval of the periodic flush in background flush mode
    #[arg(long, default_value_t = 1000)]
    pub background_flush_interval_ms: u64,

    /// Default number of rows a scanner fetches per batch
    #[arg(long, default_value_t = 1000)]
    pub scan_batch_size_rows: u32,
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn background_flush_interval(&self) -> Duration {
        Duration::from_millis(self.background_flush_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_addresses: Vec::new(),
            connect_timeout_ms: 10_000,
            rpc_timeout_ms: 30_000,
            request_max_size: 10 * 1024 * 1024,
            mutation_buffer_max_ops: 1000,
            background_flush_interval_ms: 1000,
            scan_batch_size_rows: 1000,
        }
    }
}
