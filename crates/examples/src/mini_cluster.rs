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

use anyhow::Context;
use clap::Parser;
use kestrel::server::{MiniCluster, MiniClusterConfig};
use log::info;

/// Serves an in-memory cluster until interrupted.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = MiniClusterConfig::parse();

    let cluster = MiniCluster::start(config)
        .await
        .context("failed to start the mini cluster")?;
    println!("{}", cluster.address());
    info!("Mini cluster listening on {}, press Ctrl-C to stop", cluster.address());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");
    cluster.shutdown().await?;
    Ok(())
}
