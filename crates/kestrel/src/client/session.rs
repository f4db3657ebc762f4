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

use crate::client::{KestrelClient, KestrelTable, WriteOperation, WriteOperationKind};
use crate::error::{Error, Result};
use crate::rpc::message::WriteRequest;
use crate::rpc::{ApiError, KestrelError};
use futures::FutureExt;
use log::{debug, warn};
use parking_lot::Mutex;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

/// When buffered operations are sent to the cluster.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Every `apply` sends its operation and waits for the result.
    #[default]
    AutoFlushSync,
    /// Operations are buffered and sent by background tasks, either when
    /// the buffer fills up or periodically.
    AutoFlushBackground,
    /// Operations are buffered until [`Session::flush`].
    ManualFlush,
}

/// A row the cluster refused to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    kind: WriteOperationKind,
    row: String,
    error: ApiError,
}

impl RowError {
    fn new(operation: &WriteOperation, error: ApiError) -> Self {
        Self {
            kind: operation.kind(),
            row: operation.row().to_string(),
            error,
        }
    }

    pub fn kind(&self) -> WriteOperationKind {
        self.kind
    }

    /// The rendered row, e.g. `(int32 id=1)`.
    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn error(&self) -> &ApiError {
        &self.error
    }
}

impl Display for RowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} {})", self.error, self.kind, self.row)
    }
}

#[derive(Debug, Default)]
struct ErrorCollector {
    errors: Vec<RowError>,
    failed_since_flush: usize,
    first_since_flush: Option<String>,
}

impl ErrorCollector {
    fn record(&mut self, row_errors: &[RowError], count_for_flush: bool) {
        if row_errors.is_empty() {
            return;
        }
        if count_for_flush {
            self.failed_since_flush += row_errors.len();
            if self.first_since_flush.is_none() {
                self.first_since_flush = Some(row_errors[0].to_string());
            }
        }
        self.errors.extend_from_slice(row_errors);
    }

    /// Failures since the previous call, as the error `flush` reports.
    fn take_flush_result(&mut self) -> Result<()> {
        let failed = std::mem::take(&mut self.failed_since_flush);
        match self.first_since_flush.take() {
            Some(first_error) if failed > 0 => Err(Error::PartialWrite {
                failed,
                first_error,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    client: KestrelClient,
    buffer: Mutex<Vec<WriteOperation>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    errors: Mutex<ErrorCollector>,
}

impl SessionState {
    /// Hands the whole buffer to a background send. The buffer lock is held
    /// until the task is registered, so a flush never misses it.
    fn dispatch_buffer(self: &Arc<Self>) {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return;
        }
        let operations = std::mem::take(&mut *buffer);
        let state = Arc::clone(self);
        let handle = self.client.runtime().spawn(async move {
            state.send(operations, true).await;
        });
        let mut in_flight = self.in_flight.lock();
        prune_finished(&mut in_flight);
        in_flight.push(handle);
    }

    /// Sends `operations`, one write request per table, and records every
    /// row that failed. Returns the new row errors.
    async fn send(&self, operations: Vec<WriteOperation>, count_for_flush: bool) -> Vec<RowError> {
        let mut groups: Vec<(KestrelTable, Vec<WriteOperation>)> = Vec::new();
        for operation in operations {
            match groups
                .iter_mut()
                .find(|(table, _)| table.id() == operation.table().id())
            {
                Some((_, group)) => group.push(operation),
                None => groups.push((operation.table().clone(), vec![operation])),
            }
        }

        let mut row_errors = Vec::new();
        for (table, group) in groups {
            let request = WriteRequest::new(
                table.id(),
                group.iter().map(WriteOperation::to_pb).collect(),
            );
            match table.client().request(request).await {
                Ok(response) => {
                    debug!(
                        "Wrote {} row(s) to {}, {} failed",
                        group.len(),
                        table.name(),
                        response.row_errors.len()
                    );
                    for row_error in response.row_errors {
                        let Some(operation) = group.get(row_error.row_index as usize) else {
                            warn!(
                                "Server reported an error for unknown row {} of {}",
                                row_error.row_index,
                                table.name()
                            );
                            continue;
                        };
                        let error = row_error.error.map(ApiError::from).unwrap_or_else(|| {
                            ApiError::new(KestrelError::UnknownServerError, "")
                        });
                        row_errors.push(RowError::new(operation, error));
                    }
                }
                Err(e) => {
                    warn!(
                        "Write of {} row(s) to {} failed: {e}",
                        group.len(),
                        table.name()
                    );
                    let error = e.to_api_error();
                    row_errors.extend(group.iter().map(|op| RowError::new(op, error.clone())));
                }
            }
        }

        if !row_errors.is_empty() {
            metrics::counter!(crate::metrics::SESSION_ROWS_FAILED_TOTAL)
                .increment(row_errors.len() as u64);
            self.errors.lock().record(&row_errors, count_for_flush);
        }
        row_errors
    }

    fn has_in_flight(&self) -> bool {
        self.in_flight.lock().iter().any(|h| !h.is_finished())
    }
}

/// Drops the handles of batches that are done. Their row errors are already
/// recorded.
fn prune_finished(in_flight: &mut Vec<JoinHandle<()>>) {
    in_flight.retain_mut(|handle| {
        if !handle.is_finished() {
            return true;
        }
        if let Some(Err(e)) = handle.now_or_never() {
            if !e.is_cancelled() {
                warn!("Background flush task failed: {e}");
            }
        }
        false
    });
}

/// Groups writes and controls when they reach the cluster.
///
/// A session is not shared between threads; create one per writer. Rows that
/// fail are collected and can be inspected with [`pending_errors`](Self::pending_errors).
#[derive(Debug)]
pub struct Session {
    state: Arc<SessionState>,
    flush_mode: FlushMode,
    mutation_buffer_max_ops: usize,
    ticker: Option<JoinHandle<()>>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(client: KestrelClient) -> Self {
        let mutation_buffer_max_ops = client.config().mutation_buffer_max_ops.max(1);
        Self {
            state: Arc::new(SessionState {
                client,
                buffer: Mutex::new(Vec::new()),
                in_flight: Mutex::new(Vec::new()),
                errors: Mutex::new(ErrorCollector::default()),
            }),
            flush_mode: FlushMode::default(),
            mutation_buffer_max_ops,
            ticker: None,
            closed: false,
        }
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Fails with `IllegalState` while operations are buffered or in flight.
    pub fn set_flush_mode(&mut self, mode: FlushMode) -> Result<()> {
        self.ensure_open()?;
        if self.has_pending_operations() {
            return Err(Error::IllegalState {
                message: "cannot change flush mode when writes are buffered".to_string(),
            });
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if mode == FlushMode::AutoFlushBackground {
            self.ticker = Some(self.spawn_ticker());
        }
        self.flush_mode = mode;
        Ok(())
    }

    /// Fails with `IllegalState` while operations are buffered.
    pub fn set_mutation_buffer_max_ops(&mut self, max_ops: usize) -> Result<()> {
        if self.count_buffered_operations() > 0 {
            return Err(Error::IllegalState {
                message: "cannot change the buffer size when writes are buffered".to_string(),
            });
        }
        self.mutation_buffer_max_ops = max_ops.max(1);
        Ok(())
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let state: Weak<SessionState> = Arc::downgrade(&self.state);
        let interval = self.state.client.config().background_flush_interval();
        self.state.client.runtime().spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else {
                    return;
                };
                state.dispatch_buffer();
            }
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::IllegalState {
                message: "session is closed".to_string(),
            });
        }
        Ok(())
    }

    /// Takes ownership of `operation`, whatever the outcome.
    ///
    /// Rows missing required columns are rejected before anything is sent.
    pub async fn apply(&mut self, operation: WriteOperation) -> Result<()> {
        self.ensure_open()?;
        operation.check()?;
        match self.flush_mode {
            FlushMode::AutoFlushSync => {
                let row_errors = self.state.send(vec![operation], false).await;
                match row_errors.into_iter().next() {
                    Some(row_error) => Err(Error::KestrelAPIError {
                        api_error: row_error.error,
                    }),
                    None => Ok(()),
                }
            }
            FlushMode::ManualFlush => {
                let mut buffer = self.state.buffer.lock();
                if buffer.len() >= self.mutation_buffer_max_ops {
                    return Err(Error::Incomplete {
                        message: format!(
                            "not enough mutation buffer space remaining for operation {operation}"
                        ),
                    });
                }
                buffer.push(operation);
                Ok(())
            }
            FlushMode::AutoFlushBackground => {
                let full = {
                    let mut buffer = self.state.buffer.lock();
                    buffer.push(operation);
                    buffer.len() >= self.mutation_buffer_max_ops
                };
                if full {
                    self.state.dispatch_buffer();
                }
                Ok(())
            }
        }
    }

    /// Sends everything buffered and waits for every outstanding batch.
    ///
    /// Fails with `PartialWrite` when rows applied since the previous flush
    /// were rejected; the other rows stay applied.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state.dispatch_buffer();
        loop {
            let handles = std::mem::take(&mut *self.state.in_flight.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!("Background flush task failed: {e}");
                    }
                }
            }
        }
        let result = self.state.errors.lock().take_flush_result();
        if let Err(e) = &result {
            warn!("Flush failed: {e}");
        }
        result
    }

    pub fn has_pending_operations(&self) -> bool {
        self.count_buffered_operations() > 0 || self.state.has_in_flight()
    }

    pub fn count_buffered_operations(&self) -> usize {
        self.state.buffer.lock().len()
    }

    pub fn count_pending_errors(&self) -> usize {
        self.state.errors.lock().errors.len()
    }

    /// Drains the collected row errors.
    pub fn pending_errors(&self) -> Vec<RowError> {
        std::mem::take(&mut self.state.errors.lock().errors)
    }

    /// Fails with `IllegalState` while operations are pending; flush first.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.has_pending_operations() {
            return Err(Error::IllegalState {
                message: "cannot close a session with pending operations".to_string(),
            });
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let buffered = self.state.buffer.lock().len();
        if buffered > 0 {
            warn!("Session dropped with {buffered} buffered operation(s), discarding them");
        }
    }
}
