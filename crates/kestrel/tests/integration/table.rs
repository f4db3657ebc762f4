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
mod table_test {
    use crate::integration::utils::{
        connect, create_table, key_value_schema, shared_cluster_address,
    };
    use kestrel::client::ClientBuilder;
    use kestrel::error::{Error, KestrelError};
    use kestrel::metadata::DataType;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_open_and_delete_table() {
        let client = connect().await;
        let table_name = "table_test_lifecycle";
        assert!(!client.table_exists(table_name).await.unwrap());

        let schema = key_value_schema();
        let table = create_table(&client, table_name, &schema, "key", 3).await;
        assert!(client.table_exists(table_name).await.unwrap());
        assert!(client.list_tables().await.unwrap().contains(&table_name.to_string()));

        assert_eq!(table.name(), table_name);
        assert!(!table.id().is_empty());
        assert_eq!(table.schema().num_columns(), 2);
        assert_eq!(table.schema().num_key_columns(), 1);
        assert_eq!(table.schema().primary_key_names(), vec!["key"]);
        assert_eq!(table.schema().columns()[1].data_type(), DataType::String);
        assert!(table.schema().columns()[1].is_nullable());
        assert_eq!(table.partition_schema().num_tablets(), 3);

        client
            .delete_table(table_name)
            .await
            .expect("Failed to delete table");
        assert!(!client.table_exists(table_name).await.unwrap());

        let err = client.open_table(table_name).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
        assert_eq!(err.api_error(), Some(KestrelError::TableNotExist));
        assert!(err.to_string().starts_with("Not found"));
    }

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let client = connect().await;
        let schema = key_value_schema();
        let table_name = "table_test_duplicate";
        create_table(&client, table_name, &schema, "key", 2).await;

        let mut creator = client.new_table_creator();
        creator
            .table_name(table_name)
            .schema(&schema)
            .add_hash_partitions(["key"], 2);
        let err = creator.create().await.unwrap_err();
        assert_eq!(err.api_error(), Some(KestrelError::TableAlreadyExist));
        assert!(err.to_string().starts_with("Already present"));
    }

    #[tokio::test]
    async fn test_invalid_creator_sends_nothing() {
        let client = connect().await;
        let mut creator = client.new_table_creator();
        creator
            .table_name("table_test_unpartitioned")
            .schema(&key_value_schema());
        let err = creator.create().await.unwrap_err();
        assert!(matches!(err, Error::IllegalArgument { .. }));
        assert!(
            !client
                .table_exists("table_test_unpartitioned")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_missing_table_fails() {
        let client = connect().await;
        let err = client.delete_table("table_test_never_created").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_first_reachable_master_wins() {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .add_master_server_addr("127.0.0.1:1")
            .add_master_server_addr(shared_cluster_address())
            .build()
            .await
            .expect("Failed to connect through the second master");
        assert_eq!(client.master_address(), shared_cluster_address());
        assert!(!client.cluster_id().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_master_fails() {
        let err = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .add_master_server_addr("127.0.0.1:1")
            .build()
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("Network error") || message.starts_with("Timed out"),
            "unexpected error: {message}"
        );
    }
}
