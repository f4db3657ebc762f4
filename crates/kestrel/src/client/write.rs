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

use crate::client::KestrelTable;
use crate::error::{Error, Result};
use crate::proto::PbRowOperation;
use crate::row::PartialRow;
use std::fmt::{Display, Formatter};

#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WriteOperationKind {
    Insert = 0,
    Update = 1,
    Upsert = 2,
    Delete = 3,
}

impl WriteOperationKind {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Insert),
            1 => Some(Self::Update),
            2 => Some(Self::Upsert),
            3 => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
        }
    }

    /// Insert and upsert may create a row, so every NOT NULL column must be given.
    fn requires_full_row(&self) -> bool {
        matches!(self, Self::Insert | Self::Upsert)
    }
}

impl Display for WriteOperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single-row write against one table. Applying it to a
/// [`Session`](crate::client::Session) hands it over for good.
#[derive(Debug)]
pub struct WriteOperation {
    kind: WriteOperationKind,
    table: KestrelTable,
    row: PartialRow,
}

impl WriteOperation {
    pub(crate) fn new(kind: WriteOperationKind, table: KestrelTable) -> Self {
        let row = PartialRow::new(table.schema().clone());
        Self { kind, table, row }
    }

    pub fn kind(&self) -> WriteOperationKind {
        self.kind
    }

    pub fn table(&self) -> &KestrelTable {
        &self.table
    }

    pub fn row(&self) -> &PartialRow {
        &self.row
    }

    pub fn row_mut(&mut self) -> &mut PartialRow {
        &mut self.row
    }

    /// Checks that the row carries every column this kind of write needs.
    pub fn check(&self) -> Result<()> {
        let missing_key = self.row.missing_columns(false);
        if !missing_key.is_empty() {
            return Err(Error::IllegalArgument {
                message: format!(
                    "{self}: key not specified, missing column(s) {}",
                    missing_key.join(", ")
                ),
            });
        }
        if self.kind.requires_full_row() {
            let missing = self.row.missing_columns(true);
            if !missing.is_empty() {
                return Err(Error::IllegalArgument {
                    message: format!(
                        "{self}: no value for NOT NULL column(s) {}",
                        missing.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }

    /// Deletes only carry the key.
    pub(crate) fn to_pb(&self) -> PbRowOperation {
        PbRowOperation {
            op_type: self.kind as i32,
            cells: self
                .row
                .to_cells(self.kind == WriteOperationKind::Delete),
        }
    }
}

impl Display for WriteOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::KestrelClient;
    use crate::config::Config;
    use crate::metadata::{DataType, HashDimension, PartitionSchema, SchemaBuilder, TableInfo};

    fn table() -> KestrelTable {
        let mut builder = SchemaBuilder::new();
        builder
            .add_column("id")
            .data_type(DataType::Int32)
            .primary_key();
        builder
            .add_column("count")
            .data_type(DataType::Int64)
            .not_null();
        builder.add_column("note").data_type(DataType::String);
        let info = TableInfo::new(
            "0001".to_string(),
            "t".to_string(),
            builder.build().unwrap(),
            PartitionSchema::new(vec![HashDimension::new(vec!["id".to_string()], 2)]),
        );
        let client = KestrelClient::unconnected("127.0.0.1:1", Config::default());
        KestrelTable::new(client, info)
    }

    #[tokio::test]
    async fn every_kind_needs_the_key() {
        let table = table();
        for mut operation in [
            table.new_insert(),
            table.new_update(),
            table.new_upsert(),
            table.new_delete(),
        ] {
            operation.row_mut().set_int64("count", 1).unwrap();
            let err = operation.check().unwrap_err();
            assert!(err.to_string().contains("key not specified"), "{err}");
        }
    }

    #[tokio::test]
    async fn insert_needs_not_null_columns_but_update_does_not() {
        let table = table();
        let mut insert = table.new_insert();
        insert.row_mut().set_int32("id", 1).unwrap();
        let err = insert.check().unwrap_err();
        assert!(err.to_string().contains("count"), "{err}");
        insert.row_mut().set_int64("count", 5).unwrap();
        insert.check().unwrap();

        let mut update = table.new_update();
        update.row_mut().set_int32("id", 1).unwrap();
        update.row_mut().set_string("note", "x").unwrap();
        update.check().unwrap();
        assert_eq!(update.to_string(), "UPDATE (int32 id=1, string note=\"x\")");
    }

    #[tokio::test]
    async fn delete_sends_only_the_key() {
        let table = table();
        let mut delete = table.new_delete();
        delete.row_mut().set_int32("id", 3).unwrap();
        delete.row_mut().set_int64("count", 9).unwrap();
        delete.check().unwrap();
        let pb = delete.to_pb();
        assert_eq!(pb.op_type, 3);
        assert_eq!(pb.cells.len(), 1);
        assert_eq!(pb.cells[0].column_index, 0);
    }

    #[test]
    fn kinds_round_trip() {
        for kind in [
            WriteOperationKind::Insert,
            WriteOperationKind::Update,
            WriteOperationKind::Upsert,
            WriteOperationKind::Delete,
        ] {
            assert_eq!(WriteOperationKind::from_i32(kind as i32), Some(kind));
        }
        assert_eq!(WriteOperationKind::from_i32(4), None);
        assert_eq!(WriteOperationKind::Upsert.to_string(), "UPSERT");
    }
}
