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
use crate::config::Config;
use crate::error::Result;
use std::time::Duration;

/// Collects connection settings for a [`KestrelClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: Config,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, master addresses included.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn add_master_server_addr(mut self, address: impl Into<String>) -> Self {
        self.config.master_addresses.push(address.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpc_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn mutation_buffer_max_ops(mut self, max_ops: usize) -> Self {
        self.config.mutation_buffer_max_ops = max_ops;
        self
    }

    pub fn background_flush_interval(mut self, interval: Duration) -> Self {
        self.config.background_flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects to the first reachable master.
    ///
    /// Fails with `IllegalArgument` when no master address was added.
    pub async fn build(&self) -> Result<KestrelClient> {
        KestrelClient::connect(self.config.clone()).await
    }
}
