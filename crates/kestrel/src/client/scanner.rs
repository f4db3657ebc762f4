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

use crate::ScannerId;
use crate::client::KestrelTable;
use crate::error::{Error, Result};
use crate::metadata::Schema;
use crate::rpc::message::{CloseScannerRequest, OpenScannerRequest, ScanNextRequest};
use crate::row::{Datum, RowView};
use log::debug;

/// One batch of scanned rows, in projection order.
///
/// Reused across [`Scanner::next_batch`] calls; every call replaces the content.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    projection: Schema,
    rows: Vec<Vec<Datum>>,
}

impl ScanBatch {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn projection_schema(&self) -> &Schema {
        &self.projection
    }

    pub fn row(&self, idx: usize) -> Option<RowView<'_>> {
        self.rows
            .get(idx)
            .map(|values| RowView::new(&self.projection, values))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows
            .iter()
            .map(|values| RowView::new(&self.projection, values))
    }

    fn reset(&mut self, projection: &Schema) {
        self.projection = projection.clone();
        self.rows.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerState {
    Configuring,
    Open { scanner_id: ScannerId },
    Closed,
}

/// Reads the rows of a table, tablet by tablet and in primary-key order
/// within a tablet.
///
/// Projection and batch size are set before [`open`](Self::open).
#[derive(Debug)]
pub struct Scanner {
    table: KestrelTable,
    projection: Vec<usize>,
    projection_schema: Schema,
    batch_size_rows: u32,
    state: ScannerState,
    has_more: bool,
}

impl Scanner {
    pub fn new(table: &KestrelTable) -> Self {
        let projection: Vec<usize> = (0..table.schema().num_columns()).collect();
        let projection_schema = table
            .schema()
            .project(&projection)
            .unwrap_or_else(|_| table.schema().clone());
        Self {
            batch_size_rows: table.client().config().scan_batch_size_rows,
            table: table.clone(),
            projection,
            projection_schema,
            state: ScannerState::Configuring,
            has_more: false,
        }
    }

    fn ensure_configuring(&self) -> Result<()> {
        match self.state {
            ScannerState::Configuring => Ok(()),
            ScannerState::Open { .. } => Err(Error::IllegalState {
                message: "scanner is already open".to_string(),
            }),
            ScannerState::Closed => Err(Error::IllegalState {
                message: "scanner is closed".to_string(),
            }),
        }
    }

    /// Restricts the scan to the named columns, in the given order. An empty
    /// list yields rows without columns.
    pub fn set_projected_columns<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_configuring()?;
        let schema = self.table.schema();
        let projection = names
            .into_iter()
            .map(|name| schema.column_index(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.projection_schema = schema.project(&projection)?;
        self.projection = projection;
        Ok(())
    }

    pub fn set_batch_size_rows(&mut self, batch_size_rows: u32) -> Result<()> {
        self.ensure_configuring()?;
        if batch_size_rows == 0 {
            return Err(Error::IllegalArgument {
                message: "batch size must be positive".to_string(),
            });
        }
        self.batch_size_rows = batch_size_rows;
        Ok(())
    }

    pub fn projection_schema(&self) -> &Schema {
        &self.projection_schema
    }

    pub fn table(&self) -> &KestrelTable {
        &self.table
    }

    pub async fn open(&mut self) -> Result<()> {
        self.ensure_configuring()?;
        let response = self
            .table
            .client()
            .request(OpenScannerRequest::new(
                self.table.id(),
                &self.projection,
                self.batch_size_rows,
            ))
            .await?;
        debug!(
            "Opened scanner {} on {}, rows available: {}",
            response.scanner_id,
            self.table.name(),
            response.has_more
        );
        self.state = ScannerState::Open {
            scanner_id: response.scanner_id,
        };
        self.has_more = response.has_more;
        Ok(())
    }

    pub fn has_more_rows(&self) -> bool {
        matches!(self.state, ScannerState::Open { .. }) && self.has_more
    }

    /// Replaces the content of `batch` with the next rows. Once the scan is
    /// exhausted the batch comes back empty.
    pub async fn next_batch(&mut self, batch: &mut ScanBatch) -> Result<()> {
        let scanner_id = match self.state {
            ScannerState::Open { scanner_id } => scanner_id,
            ScannerState::Configuring => {
                return Err(Error::IllegalState {
                    message: "scanner is not open".to_string(),
                });
            }
            ScannerState::Closed => {
                return Err(Error::IllegalState {
                    message: "scanner is closed".to_string(),
                });
            }
        };
        batch.reset(&self.projection_schema);
        if !self.has_more {
            return Ok(());
        }

        let response = self
            .table
            .client()
            .request(ScanNextRequest::new(scanner_id))
            .await?;
        let num_columns = self.projection.len();
        for row in response.rows {
            if row.values.len() != num_columns {
                return Err(Error::UnexpectedError {
                    message: format!(
                        "scanner {scanner_id} returned a row with {} columns, \
                         expected {num_columns}",
                        row.values.len()
                    ),
                    source: None,
                });
            }
            let values = row
                .values
                .into_iter()
                .map(Datum::from_pb)
                .collect::<Result<Vec<_>>>()?;
            batch.rows.push(values);
        }
        self.has_more = response.has_more;
        Ok(())
    }

    /// Releases the server-side cursor. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, ScannerState::Closed);
        let still_open = std::mem::take(&mut self.has_more);
        if let ScannerState::Open { scanner_id } = state {
            // an exhausted scanner is already gone on the server
            if still_open {
                self.table
                    .client()
                    .request(CloseScannerRequest::new(scanner_id))
                    .await?;
            }
            debug!("Closed scanner {scanner_id} on {}", self.table.name());
        }
        Ok(())
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        let ScannerState::Open { scanner_id } = self.state else {
            return;
        };
        if !self.has_more {
            return;
        }
        let client = self.table.client().clone();
        self.table.client().runtime().spawn(async move {
            if let Err(e) = client.request(CloseScannerRequest::new(scanner_id)).await {
                debug!("Cannot close scanner {scanner_id}: {e}");
            }
        });
    }
}
