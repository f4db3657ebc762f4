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

#[cfg(test)]
mod scanner_test {
    use crate::integration::utils::{connect, create_table, key_value_schema};
    use kestrel::client::{FlushMode, KestrelTable, ScanBatch};
    use kestrel::error::Error;
    use kestrel::metadata::{DataType, SchemaBuilder};

    async fn fill(table: &KestrelTable, num_rows: i32) {
        let mut session = table.client().new_session();
        session.set_flush_mode(FlushMode::ManualFlush).unwrap();
        for key in 0..num_rows {
            let mut insert = table.new_insert();
            insert.row_mut().set_int32("key", key).unwrap();
            insert
                .row_mut()
                .set_string("value", &format!("value-{key}"))
                .unwrap();
            session.apply(insert).await.unwrap();
        }
        session.flush().await.expect("Failed to flush rows");
    }

    #[tokio::test]
    async fn test_projection_in_small_batches() {
        let client = connect().await;
        let table =
            create_table(&client, "scanner_test_batches", &key_value_schema(), "key", 3).await;
        fill(&table, 25).await;

        let mut scanner = table.new_scanner();
        scanner.set_projected_columns(["value", "key"]).unwrap();
        scanner.set_batch_size_rows(7).unwrap();
        assert_eq!(
            scanner.projection_schema().columns()[0].data_type(),
            DataType::String
        );
        scanner.open().await.expect("Failed to open scanner");
        assert!(scanner.set_batch_size_rows(3).is_err());

        let mut batch = ScanBatch::default();
        let mut keys = Vec::new();
        let mut batches = 0;
        while scanner.has_more_rows() {
            scanner.next_batch(&mut batch).await.unwrap();
            assert!(batch.num_rows() <= 7);
            batches += 1;
            for row in batch.rows() {
                let key = row.get_int32_by_name("key").unwrap();
                assert_eq!(row.get_string_by_name("value").unwrap(), format!("value-{key}"));
                assert!(row.get_int32(0).is_err());
                keys.push(key);
            }
        }
        assert_eq!(batches, 4);
        keys.sort_unstable();
        assert_eq!(keys, (0..25).collect::<Vec<_>>());

        // exhausted scanners keep returning empty batches
        scanner.next_batch(&mut batch).await.unwrap();
        assert!(batch.is_empty());
        scanner.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_table() {
        let client = connect().await;
        let table =
            create_table(&client, "scanner_test_empty", &key_value_schema(), "key", 2).await;
        let mut scanner = table.new_scanner();
        scanner.open().await.unwrap();
        assert!(!scanner.has_more_rows());
        let mut batch = ScanBatch::default();
        scanner.next_batch(&mut batch).await.unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(batch.row(0).is_none());
    }

    #[tokio::test]
    async fn test_empty_projection_counts_rows() {
        let client = connect().await;
        let table = create_table(
            &client,
            "scanner_test_no_columns",
            &key_value_schema(),
            "key",
            2,
        )
        .await;
        fill(&table, 5).await;

        let mut scanner = table.new_scanner();
        scanner.set_projected_columns(Vec::<String>::new()).unwrap();
        scanner.open().await.unwrap();
        let mut batch = ScanBatch::default();
        let mut count = 0;
        while scanner.has_more_rows() {
            scanner.next_batch(&mut batch).await.unwrap();
            assert_eq!(batch.projection_schema().num_columns(), 0);
            assert!(batch.rows().all(|row| row.to_string() == "()"));
            count += batch.num_rows();
        }
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_unknown_projection_column() {
        let client = connect().await;
        let table = create_table(
            &client,
            "scanner_test_bad_projection",
            &key_value_schema(),
            "key",
            2,
        )
        .await;
        let mut scanner = table.new_scanner();
        let err = scanner.set_projected_columns(["nope"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
        assert!(scanner.set_batch_size_rows(0).is_err());
    }

    #[tokio::test]
    async fn test_next_batch_after_close() {
        let client = connect().await;
        let table =
            create_table(&client, "scanner_test_closed", &key_value_schema(), "key", 2).await;
        fill(&table, 10).await;

        let mut scanner = table.new_scanner();
        let mut batch = ScanBatch::default();
        assert!(matches!(
            scanner.next_batch(&mut batch).await,
            Err(Error::IllegalState { .. })
        ));
        scanner.set_batch_size_rows(2).unwrap();
        scanner.open().await.unwrap();
        scanner.next_batch(&mut batch).await.unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert!(scanner.has_more_rows());

        scanner.close().await.unwrap();
        scanner.close().await.unwrap();
        assert!(!scanner.has_more_rows());
        let err = scanner.next_batch(&mut batch).await.unwrap_err();
        assert_eq!(err.to_string(), "Illegal state: scanner is closed");
    }

    #[tokio::test]
    async fn test_scan_sees_rows_of_every_tablet() {
        let client = connect().await;
        let mut builder = SchemaBuilder::new();
        builder.add_column("a").data_type(DataType::Int64).not_null();
        builder.add_column("b").data_type(DataType::String).not_null();
        builder.set_primary_key(["a", "b"]);
        let schema = builder.build().unwrap();

        let mut creator = client.new_table_creator();
        creator
            .table_name("scanner_test_two_dimensions")
            .schema(&schema)
            .add_hash_partitions(["a"], 2)
            .add_hash_partitions(["b"], 3);
        creator.create().await.unwrap();
        let table = client.open_table("scanner_test_two_dimensions").await.unwrap();
        assert_eq!(table.partition_schema().num_tablets(), 6);

        let mut session = client.new_session();
        for i in 0..30i64 {
            let mut insert = table.new_insert();
            insert.row_mut().set_int64("a", i).unwrap();
            insert.row_mut().set_string("b", &format!("b{i}")).unwrap();
            session.apply(insert).await.unwrap();
        }
        let mut scanner = table.new_scanner();
        scanner.open().await.unwrap();
        let mut batch = ScanBatch::default();
        let mut total = 0;
        while scanner.has_more_rows() {
            scanner.next_batch(&mut batch).await.unwrap();
            total += batch.num_rows();
        }
        assert_eq!(total, 30);
    }
}
