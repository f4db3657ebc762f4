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
mod session_test {
    use crate::integration::utils::{connect, create_table, key_value_schema, scan_all};
    use kestrel::client::{FlushMode, KestrelTable, ScanBatch, WriteOperation, WriteOperationKind};
    use kestrel::error::{Error, KestrelError};
    use kestrel::metadata::{DataType, SchemaBuilder};

    fn insert(table: &KestrelTable, key: i32, value: &str) -> WriteOperation {
        let mut insert = table.new_insert();
        insert.row_mut().set_int32("key", key).unwrap();
        insert.row_mut().set_string("value", value).unwrap();
        insert
    }

    #[tokio::test]
    async fn test_sync_apply_reports_row_errors() {
        let client = connect().await;
        let table = create_table(&client, "session_test_sync", &key_value_schema(), "key", 2).await;
        let mut session = client.new_session();
        assert_eq!(session.flush_mode(), FlushMode::AutoFlushSync);

        session
            .apply(insert(&table, 1, "a"))
            .await
            .expect("Failed to insert row");
        let err = session.apply(insert(&table, 1, "b")).await.unwrap_err();
        assert_eq!(err.api_error(), Some(KestrelError::AlreadyPresent));

        assert_eq!(session.count_pending_errors(), 1);
        let errors = session.pending_errors();
        assert_eq!(errors[0].kind(), WriteOperationKind::Insert);
        assert_eq!(errors[0].row(), "(int32 key=1, string value=\"b\")");
        assert_eq!(session.count_pending_errors(), 0);

        session.flush().await.expect("Nothing to flush");
        assert_eq!(scan_all(&table).await, vec!["(int32 key=1, string value=\"a\")"]);
        session.close().expect("Failed to close session");
    }

    #[tokio::test]
    async fn test_manual_flush_partial_failure() {
        let client = connect().await;
        let table =
            create_table(&client, "session_test_manual", &key_value_schema(), "key", 2).await;
        let mut session = client.new_session();
        session.set_flush_mode(FlushMode::ManualFlush).unwrap();

        session.apply(insert(&table, 1, "a")).await.unwrap();
        session.apply(insert(&table, 2, "b")).await.unwrap();
        session.apply(insert(&table, 1, "c")).await.unwrap();
        assert_eq!(session.count_buffered_operations(), 3);
        assert!(scan_all(&table).await.is_empty());

        match session.flush().await {
            Err(Error::PartialWrite {
                failed,
                first_error,
            }) => {
                assert_eq!(failed, 1);
                assert!(first_error.starts_with("Already present"), "{first_error}");
            }
            other => panic!("expected a partial write, got {other:?}"),
        }
        assert!(!session.has_pending_operations());
        assert_eq!(session.count_pending_errors(), 1);
        assert_eq!(scan_all(&table).await.len(), 2);

        // reported once
        session.flush().await.expect("No new failures");
    }

    #[tokio::test]
    async fn test_background_flush() {
        let client = connect().await;
        let table = create_table(
            &client,
            "session_test_background",
            &key_value_schema(),
            "key",
            2,
        )
        .await;
        let mut session = client.new_session();
        session.set_flush_mode(FlushMode::AutoFlushBackground).unwrap();
        session.set_mutation_buffer_max_ops(4).unwrap();

        for key in 0..10 {
            session
                .apply(insert(&table, key, &format!("v{key}")))
                .await
                .expect("Failed to buffer row");
        }
        session.flush().await.expect("Failed to flush");
        assert!(!session.has_pending_operations());
        assert_eq!(scan_all(&table).await.len(), 10);

        session.set_flush_mode(FlushMode::AutoFlushSync).unwrap();
        session.close().unwrap();
    }

    #[tokio::test]
    async fn test_update_upsert_delete() {
        let client = connect().await;
        let table = create_table(&client, "session_test_mutations", &key_value_schema(), "key", 2)
            .await;
        let mut session = client.new_session();

        let mut update = table.new_update();
        update.row_mut().set_int32("key", 7).unwrap();
        update.row_mut().set_string("value", "x").unwrap();
        let err = session.apply(update).await.unwrap_err();
        assert_eq!(err.api_error(), Some(KestrelError::NotFound));

        let mut upsert = table.new_upsert();
        upsert.row_mut().set_int32("key", 7).unwrap();
        upsert.row_mut().set_string("value", "first").unwrap();
        session.apply(upsert).await.unwrap();

        let mut update = table.new_update();
        update.row_mut().set_int32("key", 7).unwrap();
        update.row_mut().set_null("value").unwrap();
        session.apply(update).await.unwrap();
        assert_eq!(scan_all(&table).await, vec!["(int32 key=7, string value=NULL)"]);

        let mut delete = table.new_delete();
        delete.row_mut().set_int32("key", 7).unwrap();
        session.apply(delete).await.unwrap();
        assert!(scan_all(&table).await.is_empty());

        let mut delete = table.new_delete();
        delete.row_mut().set_int32("key", 7).unwrap();
        let err = session.apply(delete).await.unwrap_err();
        assert_eq!(err.api_error(), Some(KestrelError::NotFound));
    }

    #[tokio::test]
    async fn test_every_column_type() {
        let client = connect().await;
        let mut builder = SchemaBuilder::new();
        builder.add_column("k8").data_type(DataType::Int8).not_null();
        builder.add_column("k16").data_type(DataType::Int16).not_null();
        builder.add_column("k64").data_type(DataType::Int64).not_null();
        builder.add_column("i32").data_type(DataType::Int32);
        builder.add_column("s").data_type(DataType::String);
        builder.add_column("b").data_type(DataType::Bool);
        builder.add_column("f").data_type(DataType::Float);
        builder.add_column("d").data_type(DataType::Double);
        builder.add_column("bin").data_type(DataType::Binary);
        builder
            .add_column("ts")
            .data_type(DataType::UnixtimeMicros);
        builder.set_primary_key(["k8", "k16", "k64"]);
        let schema = builder.build().unwrap();
        let table = create_table(&client, "session_test_types", &schema, "k64", 2).await;

        let mut session = client.new_session();
        let mut insert = table.new_insert();
        let row = insert.row_mut();
        row.set_int8("k8", -8).unwrap();
        row.set_int16("k16", 16).unwrap();
        row.set_int64("k64", i64::MAX).unwrap();
        row.set_int32("i32", -32).unwrap();
        row.set_string("s", "hello").unwrap();
        row.set_bool("b", true).unwrap();
        row.set_float("f", 1.5).unwrap();
        row.set_double("d", -2.25).unwrap();
        row.set_binary("bin", &[0, 1, 2, 255]).unwrap();
        row.set_unixtime_micros("ts", 1_000_001).unwrap();
        assert!(matches!(
            row.set_int32("k8", 1),
            Err(Error::TypeMismatch { .. })
        ));
        session.apply(insert).await.expect("Failed to insert row");

        let mut scanner = table.new_scanner();
        scanner.open().await.unwrap();
        let mut batch = ScanBatch::default();
        scanner.next_batch(&mut batch).await.unwrap();
        assert_eq!(batch.num_rows(), 1);
        let row = batch.row(0).unwrap();
        assert_eq!(row.get_int8_by_name("k8").unwrap(), -8);
        assert_eq!(row.get_int16_by_name("k16").unwrap(), 16);
        assert_eq!(row.get_int64_by_name("k64").unwrap(), i64::MAX);
        assert_eq!(row.get_int32_by_name("i32").unwrap(), -32);
        assert_eq!(row.get_string_by_name("s").unwrap(), "hello");
        assert!(row.get_bool_by_name("b").unwrap());
        assert_eq!(row.get_float_by_name("f").unwrap(), 1.5);
        assert_eq!(row.get_double_by_name("d").unwrap(), -2.25);
        assert_eq!(row.get_binary_by_name("bin").unwrap(), &[0, 1, 2, 255]);
        assert_eq!(row.get_unixtime_micros_by_name("ts").unwrap(), 1_000_001);
        assert_eq!(
            row.to_string(),
            "(int8 k8=-8, int16 k16=16, int64 k64=9223372036854775807, int32 i32=-32, \
             string s=\"hello\", bool b=true, float f=1.5, double d=-2.25, \
             binary bin=\"\\x00\\x01\\x02\\xff\", unixtime_micros ts=1970-01-01T00:00:01.000001Z)"
        );
    }
}
