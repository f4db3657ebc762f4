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

use crate::client::{KestrelTable, Session, TableCreator};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::TableInfo;
use crate::rpc::RpcClient;
use crate::rpc::message::{
    ConnectToMasterRequest, DeleteTableRequest, GetTableRequest, ListTablesRequest,
    ReadVersionedType, RequestBody, TableExistsRequest, WriteVersionedType,
};
use log::{info, warn};
use std::io::Cursor;
use std::sync::Arc;
use tokio::runtime::Handle;

/// A connection to a Kestrel cluster.
///
/// Cheap to clone; clones share the connection pool. Tables, sessions and
/// scanners created from a client keep it alive.
#[derive(Debug, Clone)]
pub struct KestrelClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    rpc: RpcClient,
    master: String,
    cluster_id: String,
    config: Config,
    runtime: Handle,
}

impl KestrelClient {
    pub(crate) async fn connect(config: Config) -> Result<Self> {
        if config.master_addresses.is_empty() {
            return Err(Error::IllegalArgument {
                message: "no master address specified".to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|e| Error::UnexpectedError {
            message: "the client must be built inside a tokio runtime".to_string(),
            source: Some(Box::new(e)),
        })?;
        let rpc = RpcClient::new()
            .with_timeout(config.connect_timeout())
            .with_max_message_size(config.request_max_size);

        let mut last_error = None;
        for master in &config.master_addresses {
            let attempt = tokio::time::timeout(config.rpc_timeout(), async {
                rpc.get_connection(master)
                    .await?
                    .request(ConnectToMasterRequest::new())
                    .await
            })
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout {
                    message: format!("connecting to master {master}"),
                })
            });
            match attempt {
                Ok(response) => {
                    info!(
                        "Connected to master {master} (cluster {}, version {})",
                        response.cluster_id, response.server_version
                    );
                    return Ok(KestrelClient {
                        inner: Arc::new(ClientInner {
                            master: master.clone(),
                            cluster_id: response.cluster_id,
                            rpc,
                            config,
                            runtime,
                        }),
                    });
                }
                Err(e) => {
                    warn!("Cannot connect to master {master}: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::IllegalArgument {
            message: "no master address specified".to_string(),
        }))
    }

    /// Sends one request to the master, bounded by the rpc timeout.
    pub(crate) async fn request<R>(&self, request: R) -> Result<R::ResponseBody>
    where
        R: RequestBody + Send + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let timeout = self.inner.config.rpc_timeout();
        let master = &self.inner.master;
        tokio::time::timeout(timeout, async {
            self.inner
                .rpc
                .get_connection(master)
                .await?
                .request(request)
                .await
        })
        .await
        .map_err(|_| Error::Timeout {
            message: format!(
                "{:?} request to {master} did not complete within {timeout:?}",
                R::API_KEY
            ),
        })?
    }

    /// A client that has not talked to any master. Requests fail unless
    /// something listens on `master`.
    #[cfg(test)]
    pub(crate) fn unconnected(master: &str, config: Config) -> Self {
        KestrelClient {
            inner: Arc::new(ClientInner {
                rpc: RpcClient::new().with_timeout(config.connect_timeout()),
                master: master.to_string(),
                cluster_id: String::new(),
                config,
                runtime: Handle::current(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn master_address(&self) -> &str {
        &self.inner.master
    }

    pub fn cluster_id(&self) -> &str {
        &self.inner.cluster_id
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    pub fn new_table_creator(&self) -> TableCreator {
        TableCreator::new(self.clone())
    }

    /// `Ok(false)` when the table is absent; errors mean the question could
    /// not be answered.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let response = self.request(TableExistsRequest::new(table_name)).await?;
        Ok(response.exists)
    }

    pub async fn open_table(&self, table_name: &str) -> Result<KestrelTable> {
        let response = self.request(GetTableRequest::new(table_name)).await?;
        let info = TableInfo::from_pb(response)?;
        Ok(KestrelTable::new(self.clone(), info))
    }

    pub async fn delete_table(&self, table_name: &str) -> Result<()> {
        self.request(DeleteTableRequest::new(table_name)).await?;
        info!("Deleted table {table_name}");
        Ok(())
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let response = self.request(ListTablesRequest::new()).await?;
        Ok(response.table_names)
    }

    /// A new session in `AutoFlushSync` mode.
    pub fn new_session(&self) -> Session {
        Session::new(self.clone())
    }
}
