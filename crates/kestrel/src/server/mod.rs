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

//! An in-process cluster that serves the Kestrel protocol from memory.
//!
//! Used by the integration tests and the `mini-cluster` binary. One process
//! plays master and tablet server; tables live in memory until the cluster is
//! shut down.

mod catalog;
mod service;

use crate::error::{Error, Result};
use crate::proto::ErrorResponse;
use crate::rpc::RpcError;
use crate::rpc::frame::{AsyncMessageRead, AsyncMessageWrite, ReadError, WriteError};
use crate::rpc::message::{ReadVersionedType, RequestHeader, ResponseHeader, WriteVersionedType};
use crate::rpc::ApiVersion;
use clap::Parser;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use service::KestrelService;
use std::io::{Cursor, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version, about = "In-memory Kestrel cluster", long_about = None)]
pub struct MiniClusterConfig {
    /// Address to listen on; port 0 picks a free port
    #[arg(long, default_value = "127.0.0.1:0")]
    pub bind_address: String,

    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub request_max_size: usize,

    /// Rows per scan batch when a scanner does not ask for a size
    #[arg(long, default_value_t = 1000)]
    pub default_scan_batch_size_rows: u32,
}

impl Default for MiniClusterConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            request_max_size: 10 * 1024 * 1024,
            default_scan_batch_size_rows: 1000,
        }
    }
}

/// A running mini cluster. Dropping it stops the listener and every open
/// connection.
#[derive(Debug)]
pub struct MiniCluster {
    address: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
}

impl MiniCluster {
    /// Binds the listener and starts serving on the current runtime.
    pub async fn start(config: MiniClusterConfig) -> Result<MiniCluster> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        let address = listener.local_addr()?;
        let service = Arc::new(KestrelService::new(
            format!("mini-cluster-{}", address.port()),
            config.default_scan_batch_size_rows,
        ));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            service,
            config.request_max_size,
            shutdown_rx,
        ));
        info!("Mini cluster listening on {address}");
        Ok(MiniCluster {
            address,
            shutdown_tx: Some(shutdown_tx),
            accept_task: Some(accept_task),
        })
    }

    /// `host:port` for clients to connect to.
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stops accepting connections and closes the open ones.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // the loop may already be gone
            let _ = shutdown_tx.send(());
        }
        if let Some(accept_task) = self.accept_task.take() {
            match accept_task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    return Err(Error::UnexpectedError {
                        message: "mini cluster accept loop failed".to_string(),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }
        info!("Mini cluster at {} shut down", self.address);
        Ok(())
    }
}

impl Drop for MiniCluster {
    fn drop(&mut self) {
        if let Some(accept_task) = &self.accept_task {
            accept_task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    service: Arc<KestrelService>,
    max_message_size: usize,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    // dropping the set aborts every connection task
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {peer}");
                    let service = Arc::clone(&service);
                    connections.spawn(async move {
                        if let Err(e) = serve_connection(service, stream, max_message_size).await {
                            warn!("Connection from {peer} closed: {e}");
                        }
                    });
                }
                Err(e) => warn!("Accept failed: {e}"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = &mut shutdown_rx => break,
        }
    }
}

/// Serves requests from one client in arrival order until it disconnects.
async fn serve_connection(
    service: Arc<KestrelService>,
    stream: TcpStream,
    max_message_size: usize,
) -> std::result::Result<(), RpcError> {
    stream.set_nodelay(true).map_err(ReadError::from)?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    loop {
        let message = match reader.read_message(max_message_size).await {
            Ok(message) => message,
            Err(ReadError::IO(e)) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let mut cursor = Cursor::new(message);
        let header = RequestHeader::read_versioned(&mut cursor, ApiVersion(0))?;
        let offset = cursor.position() as usize;
        let body = &cursor.get_ref()[offset..];

        let mut response = Vec::new();
        match service.handle(&header, body) {
            Ok(encoded) => {
                ResponseHeader {
                    request_id: header.request_id,
                    error_response: None,
                }
                .write_versioned(&mut response, ApiVersion(0))?;
                response.extend_from_slice(&encoded);
            }
            Err(api_error) => {
                debug!(
                    "{:?} request {} failed: {api_error}",
                    header.request_api_key, header.request_id
                );
                ResponseHeader {
                    request_id: header.request_id,
                    error_response: Some(ErrorResponse::from(&api_error)),
                }
                .write_versioned(&mut response, ApiVersion(0))?;
            }
        }
        writer.write_message(&response).await?;
        writer.flush().await.map_err(WriteError::from)?;
    }
}
