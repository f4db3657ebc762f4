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

//! Drives the extern "C" surface end to end against an in-process cluster.

use kestrel::rpc::KestrelError;
use kestrel::server::{MiniCluster, MiniClusterConfig};
use kestrel_c::*;
use std::ffi::{CStr, CString, c_char};
use std::ptr::{self, NonNull};
use std::sync::LazyLock;
use tokio::runtime::Runtime;

struct SharedCluster {
    address: String,
    _cluster: MiniCluster,
    _runtime: Runtime,
}

static SHARED_CLUSTER: LazyLock<SharedCluster> = LazyLock::new(|| {
    std::thread::spawn(|| {
        let rt = Runtime::new().expect("Failed to create runtime");
        let cluster = rt
            .block_on(MiniCluster::start(MiniClusterConfig::default()))
            .expect("Failed to start mini cluster");
        SharedCluster {
            address: cluster.address(),
            _cluster: cluster,
            _runtime: rt,
        }
    })
    .join()
    .expect("Failed to initialize shared cluster")
});

fn c(value: &str) -> CString {
    CString::new(value).unwrap()
}

unsafe fn take_string(value: *mut c_char) -> String {
    assert!(!value.is_null());
    let owned = unsafe { CStr::from_ptr(value) }.to_str().unwrap().to_string();
    unsafe { kestrel_string_free(value) };
    owned
}

unsafe fn ok(status: *mut kestrel_status) {
    if !status.is_null() {
        let message = unsafe { take_string(kestrel_status_message(status)) };
        unsafe { kestrel_status_free(status) };
        panic!("unexpected error status: {message}");
    }
}

/// Code and message of a status that must be an error.
unsafe fn error(status: *mut kestrel_status) -> (i32, String) {
    assert!(!status.is_null(), "expected an error status");
    let code = unsafe { kestrel_status_code(status) };
    let message = unsafe { take_string(kestrel_status_message(status)) };
    unsafe { kestrel_status_free(status) };
    assert!(!message.is_empty());
    (code, message)
}

unsafe fn connect() -> *mut kestrel_client {
    let address = c(&SHARED_CLUSTER.address);
    unsafe {
        let builder = kestrel_client_builder_create();
        ok(kestrel_client_builder_add_master_server_addr(builder, address.as_ptr()));
        let mut client = ptr::null_mut();
        ok(kestrel_client_builder_build(builder, &mut client));
        kestrel_client_builder_free(builder);
        assert!(!client.is_null());
        client
    }
}

/// `(id INT32 NOT NULL, name STRING)` keyed on `id`.
unsafe fn id_name_schema() -> *mut kestrel_schema {
    let id = c("id");
    let name = c("name");
    unsafe {
        let builder = kestrel_schema_builder_create();
        let spec = kestrel_schema_builder_add_column(builder, id.as_ptr());
        kestrel_column_spec_set_not_null(kestrel_column_spec_set_type(spec, KESTREL_TYPE_INT32));
        let spec = kestrel_schema_builder_add_column(builder, name.as_ptr());
        kestrel_column_spec_set_type(spec, KESTREL_TYPE_STRING);
        let key = [id.as_ptr()];
        ok(kestrel_schema_builder_set_primary_key(builder, key.as_ptr(), 1));
        let mut schema = ptr::null_mut();
        ok(kestrel_schema_builder_build(builder, &mut schema));
        kestrel_schema_builder_free(builder);
        schema
    }
}

unsafe fn create_table(
    client: *mut kestrel_client,
    table_name: &str,
    schema: *const kestrel_schema,
) -> *mut kestrel_table {
    let table_name = c(table_name);
    let id = c("id");
    unsafe {
        let creator = kestrel_client_new_table_creator(client);
        ok(kestrel_table_creator_set_table_name(creator, table_name.as_ptr()));
        ok(kestrel_table_creator_set_schema(creator, schema));
        let columns = [id.as_ptr()];
        ok(kestrel_table_creator_add_hash_partitions(
            creator,
            columns.as_ptr(),
            1,
            2,
        ));
        ok(kestrel_table_creator_create(creator));
        kestrel_table_creator_free(creator);

        let mut table = ptr::null_mut();
        ok(kestrel_client_open_table(client, table_name.as_ptr(), &mut table));
        table
    }
}

unsafe fn insert(table: *mut kestrel_table, id: i32, name: &str) -> *mut kestrel_write_operation {
    let id_column = c("id");
    let name_column = c("name");
    let name = c(name);
    unsafe {
        let operation = kestrel_table_new_insert(table);
        ok(kestrel_write_operation_set_int32(operation, id_column.as_ptr(), id));
        ok(kestrel_write_operation_set_string(
            operation,
            name_column.as_ptr(),
            name.as_ptr(),
        ));
        operation
    }
}

/// Ids of every row, in scan order, fetching `batch_size` rows at a time.
unsafe fn scan_ids(table: *mut kestrel_table, batch_size: u32) -> Vec<i32> {
    let id = c("id");
    let mut ids = Vec::new();
    unsafe {
        let scanner = kestrel_table_new_scanner(table);
        ok(kestrel_scanner_set_batch_size_rows(scanner, batch_size));
        ok(kestrel_scanner_open(scanner));
        let mut batch = ptr::null_mut();
        while kestrel_scanner_has_more_rows(scanner) {
            ok(kestrel_scanner_next_batch(scanner, &mut batch));
            assert!(kestrel_scan_batch_num_rows(batch) <= batch_size as usize);
            while kestrel_scan_batch_has_next(batch) {
                kestrel_scan_batch_seek_next(batch);
                let mut value = 0;
                ok(kestrel_scan_batch_row_get_int32(batch, id.as_ptr(), &mut value));
                ids.push(value);
            }
        }
        kestrel_scan_batch_free(batch);
        kestrel_scanner_free(scanner);
    }
    ids
}

#[test]
fn build_failure_leaves_client_untouched() {
    let address = c("127.0.0.1:1");
    unsafe {
        let builder = kestrel_client_builder_create();
        let mut client = NonNull::<kestrel_client>::dangling().as_ptr();
        let untouched = client;
        let (code, message) = error(kestrel_client_builder_build(builder, &mut client));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert_eq!(message, "Invalid argument: no master address specified");
        assert_eq!(client, untouched);

        ok(kestrel_client_builder_add_master_server_addr(builder, address.as_ptr()));
        ok(kestrel_client_builder_set_rpc_timeout_ms(builder, 2_000));
        let (code, _) = error(kestrel_client_builder_build(builder, &mut client));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert_eq!(client, untouched);
        kestrel_client_builder_free(builder);
    }
}

#[test]
fn builder_free_keeps_client_usable() {
    unsafe {
        let client = connect();
        let missing = c("bridge_never_created");
        let mut exists = true;
        ok(kestrel_client_table_exists(client, missing.as_ptr(), &mut exists));
        assert!(!exists);
        // idempotent
        ok(kestrel_client_table_exists(client, missing.as_ptr(), &mut exists));
        assert!(!exists);

        let mut table = NonNull::<kestrel_table>::dangling().as_ptr();
        let untouched = table;
        let (code, message) =
            error(kestrel_client_open_table(client, missing.as_ptr(), &mut table));
        assert_eq!(code, KestrelError::TableNotExist.code());
        assert!(message.starts_with("Not found"), "{message}");
        assert_eq!(table, untouched);
        kestrel_client_free(client);
    }
}

#[test]
fn manual_flush_writes_exactly_the_applied_rows() {
    unsafe {
        let client = connect();
        let schema = id_name_schema();
        let table = create_table(client, "bridge_manual_flush", schema);
        assert_eq!(take_string(kestrel_table_name(table)), "bridge_manual_flush");

        let session = kestrel_client_new_session(client);
        ok(kestrel_session_set_flush_mode(session, KESTREL_MANUAL_FLUSH));
        for id in [3, 1, 2] {
            ok(kestrel_session_apply(session, insert(table, id, "n")));
        }
        assert_eq!(kestrel_session_count_buffered_operations(session), 3);
        assert!(kestrel_session_has_pending_operations(session));
        let (_, message) = error(kestrel_session_set_flush_mode(session, KESTREL_AUTO_FLUSH_SYNC));
        assert!(message.starts_with("Illegal state"), "{message}");

        ok(kestrel_session_flush(session));
        assert!(!kestrel_session_has_pending_operations(session));
        let mut ids = scan_ids(table, 2);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);

        // a duplicate key fails the flush, the other row stays applied
        ok(kestrel_session_apply(session, insert(table, 1, "again")));
        ok(kestrel_session_apply(session, insert(table, 4, "n")));
        let (code, message) = error(kestrel_session_flush(session));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert!(message.contains("1 row(s) failed"), "{message}");
        assert_eq!(kestrel_session_count_pending_errors(session), 1);
        assert_eq!(scan_ids(table, 100).len(), 4);

        kestrel_session_close(session);
        kestrel_table_close(table);
        kestrel_schema_free(schema);
        kestrel_client_free(client);
    }
}

#[test]
fn scan_observes_every_row_once() {
    unsafe {
        let client = connect();
        let schema = id_name_schema();
        let table = create_table(client, "bridge_scan", schema);
        let session = kestrel_client_new_session(client);
        ok(kestrel_session_set_flush_mode(session, KESTREL_AUTO_FLUSH_BACKGROUND));
        for id in 0..20 {
            ok(kestrel_session_apply(session, insert(table, id, &format!("row {id}"))));
        }
        ok(kestrel_session_flush(session));

        let mut ids = scan_ids(table, 6);
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());

        kestrel_session_close(session);
        kestrel_table_close(table);
        kestrel_schema_free(schema);
        kestrel_client_free(client);
    }
}

#[test]
fn sync_apply_consumes_failed_operations() {
    unsafe {
        let client = connect();
        let schema = id_name_schema();
        let table = create_table(client, "bridge_sync_apply", schema);
        let session = kestrel_client_new_session(client);

        ok(kestrel_session_apply(session, insert(table, 1, "a")));
        let (code, message) = error(kestrel_session_apply(session, insert(table, 1, "b")));
        assert_eq!(code, KestrelError::AlreadyPresent.code());
        assert!(message.starts_with("Already present"), "{message}");

        // missing key, rejected before sending
        let operation = kestrel_table_new_insert(table);
        let (code, message) = error(kestrel_session_apply(session, operation));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert!(message.contains("key not specified"), "{message}");

        let (_, message) = error(kestrel_session_apply(session, ptr::null_mut()));
        assert_eq!(message, "Invalid argument: null write operation");

        let id = c("id");
        let delete = kestrel_table_new_delete(table);
        ok(kestrel_write_operation_set_int32(delete, id.as_ptr(), 1));
        ok(kestrel_session_apply(session, delete));
        assert!(scan_ids(table, 10).is_empty());

        kestrel_session_close(session);
        kestrel_table_close(table);
        kestrel_schema_free(schema);
        kestrel_client_free(client);
    }
}

#[test]
fn pending_errors_are_drained() {
    unsafe {
        let client = connect();
        let schema = id_name_schema();
        let table = create_table(client, "bridge_pending_errors", schema);
        let session = kestrel_client_new_session(client);

        ok(kestrel_session_apply(session, insert(table, 1, "a")));
        for _ in 0..50 {
            let (code, _) = error(kestrel_session_apply(session, insert(table, 1, "dup")));
            assert_eq!(code, KestrelError::AlreadyPresent.code());
        }
        ok(kestrel_session_flush(session));
        assert_eq!(kestrel_session_count_pending_errors(session), 50);

        let mut errors = ptr::null_mut();
        ok(kestrel_session_get_pending_errors(session, &mut errors));
        assert_eq!(kestrel_session_count_pending_errors(session), 0);
        assert_eq!(kestrel_row_errors_count(errors), 50);
        assert_eq!(
            kestrel_row_errors_code(errors, 49),
            KestrelError::AlreadyPresent.code()
        );
        let message = take_string(kestrel_row_errors_message(errors, 0));
        assert!(message.starts_with("Already present"), "{message}");
        let operation = take_string(kestrel_row_errors_operation(errors, 0));
        assert!(operation.starts_with("INSERT ("), "{operation}");
        assert!(operation.contains("id=1"), "{operation}");
        assert_eq!(kestrel_row_errors_code(errors, 50), 0);
        assert!(kestrel_row_errors_message(errors, 50).is_null());
        assert!(kestrel_row_errors_operation(errors, 50).is_null());
        kestrel_row_errors_free(errors);

        let mut empty = ptr::null_mut();
        ok(kestrel_session_get_pending_errors(session, &mut empty));
        assert_eq!(kestrel_row_errors_count(empty), 0);
        kestrel_row_errors_free(empty);

        let (_, message) = error(kestrel_session_get_pending_errors(session, ptr::null_mut()));
        assert_eq!(message, "Invalid argument: null errors out-parameter");
        let (_, message) = error(kestrel_session_get_pending_errors(
            ptr::null_mut(),
            &mut empty,
        ));
        assert_eq!(message, "Invalid argument: null session");
        assert_eq!(kestrel_row_errors_count(ptr::null()), 0);
        kestrel_row_errors_free(ptr::null_mut());

        kestrel_session_close(session);
        kestrel_table_close(table);
        kestrel_schema_free(schema);
        kestrel_client_free(client);
    }
}

#[test]
fn setters_and_getters_cover_every_type() {
    let names = [
        "k", "i8", "i16", "i64", "s", "b", "f", "d", "bin", "ts", "missing",
    ];
    let names: Vec<CString> = names.iter().map(|n| c(n)).collect();
    let col = |idx: usize| names[idx].as_ptr();
    let types = [
        KESTREL_TYPE_INT32,
        KESTREL_TYPE_INT8,
        KESTREL_TYPE_INT16,
        KESTREL_TYPE_INT64,
        KESTREL_TYPE_STRING,
        KESTREL_TYPE_BOOL,
        KESTREL_TYPE_FLOAT,
        KESTREL_TYPE_DOUBLE,
        KESTREL_TYPE_BINARY,
        KESTREL_TYPE_UNIXTIME_MICROS,
    ];
    unsafe {
        let builder = kestrel_schema_builder_create();
        for (idx, data_type) in types.iter().enumerate() {
            let spec = kestrel_schema_builder_add_column(builder, col(idx));
            kestrel_column_spec_set_type(spec, *data_type);
            if idx == 0 {
                kestrel_column_spec_set_primary_key(spec);
            }
        }
        let mut schema = ptr::null_mut();
        ok(kestrel_schema_builder_build(builder, &mut schema));
        kestrel_schema_builder_free(builder);
        assert_eq!(kestrel_schema_num_columns(schema), 10);
        assert_eq!(kestrel_schema_column_type(schema, 9), KESTREL_TYPE_UNIXTIME_MICROS);
        assert!(!kestrel_schema_column_is_nullable(schema, 0));

        let client = connect();
        let table_name = c("bridge_types");
        let creator = kestrel_client_new_table_creator(client);
        ok(kestrel_table_creator_set_table_name(creator, table_name.as_ptr()));
        ok(kestrel_table_creator_set_schema(creator, schema));
        let (_, message) = error(kestrel_table_creator_create(creator));
        assert_eq!(
            message,
            "Invalid argument: table partitioning must be specified using add_hash_partitions"
        );
        let (_, message) = error(kestrel_table_creator_create(creator));
        assert_eq!(message, "Illegal state: table creator has already been used");
        kestrel_table_creator_free(creator);

        let key = [col(0)];
        let creator = kestrel_client_new_table_creator(client);
        ok(kestrel_table_creator_set_table_name(creator, table_name.as_ptr()));
        ok(kestrel_table_creator_set_schema(creator, schema));
        ok(kestrel_table_creator_add_hash_partitions(creator, key.as_ptr(), 1, 3));
        ok(kestrel_table_creator_create(creator));
        kestrel_table_creator_free(creator);
        let mut table = ptr::null_mut();
        ok(kestrel_client_open_table(client, table_name.as_ptr(), &mut table));

        let value = c("text");
        let operation = kestrel_table_new_insert(table);
        ok(kestrel_write_operation_set_int32(operation, col(0), 1));
        ok(kestrel_write_operation_set_int8(operation, col(1), -1));
        ok(kestrel_write_operation_set_int16(operation, col(2), 300));
        ok(kestrel_write_operation_set_int64(operation, col(3), 1 << 40));
        ok(kestrel_write_operation_set_string(operation, col(4), value.as_ptr()));
        ok(kestrel_write_operation_set_bool(operation, col(5), true));
        ok(kestrel_write_operation_set_float(operation, col(6), 0.5));
        ok(kestrel_write_operation_set_double(operation, col(7), 2.5));
        ok(kestrel_write_operation_set_binary(operation, col(8), [7u8, 0, 200].as_ptr(), 3));
        ok(kestrel_write_operation_set_null(operation, col(9)));
        let (code, message) = error(kestrel_write_operation_set_int64(operation, col(0), 1));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert!(message.starts_with("Invalid argument"), "{message}");
        let (_, message) = error(kestrel_write_operation_set_bool(operation, col(10), true));
        assert_eq!(message, "Not found: No such column: missing");

        let session = kestrel_client_new_session(client);
        ok(kestrel_session_apply(session, operation));

        let scanner = kestrel_table_new_scanner(table);
        ok(kestrel_scanner_open(scanner));
        let (_, message) = error(kestrel_scanner_set_projected_columns(
            scanner,
            key.as_ptr(),
            1,
        ));
        assert_eq!(message, "Illegal state: scanner is already open");
        let mut batch = ptr::null_mut();
        ok(kestrel_scanner_next_batch(scanner, &mut batch));
        assert_eq!(kestrel_scan_batch_num_rows(batch), 1);

        let mut i32_value = 0;
        let (_, message) = error(kestrel_scan_batch_row_get_int32(batch, col(0), &mut i32_value));
        assert_eq!(message, "Illegal state: no current row");
        kestrel_scan_batch_seek_next(batch);

        ok(kestrel_scan_batch_row_get_int32(batch, col(0), &mut i32_value));
        assert_eq!(i32_value, 1);
        let mut i8_value = 0;
        ok(kestrel_scan_batch_row_get_int8(batch, col(1), &mut i8_value));
        assert_eq!(i8_value, -1);
        let mut i16_value = 0;
        ok(kestrel_scan_batch_row_get_int16(batch, col(2), &mut i16_value));
        assert_eq!(i16_value, 300);
        let mut i64_value = 0;
        ok(kestrel_scan_batch_row_get_int64(batch, col(3), &mut i64_value));
        assert_eq!(i64_value, 1 << 40);
        let mut string_value = ptr::null_mut();
        ok(kestrel_scan_batch_row_get_string(batch, col(4), &mut string_value));
        assert_eq!(take_string(string_value), "text");
        let mut bool_value = false;
        ok(kestrel_scan_batch_row_get_bool(batch, col(5), &mut bool_value));
        assert!(bool_value);
        let mut float_value = 0.0;
        ok(kestrel_scan_batch_row_get_float(batch, col(6), &mut float_value));
        assert_eq!(float_value, 0.5);
        let mut double_value = 0.0;
        ok(kestrel_scan_batch_row_get_double(batch, col(7), &mut double_value));
        assert_eq!(double_value, 2.5);
        let mut data = ptr::null();
        let mut len = 0;
        ok(kestrel_scan_batch_row_get_binary(batch, col(8), &mut data, &mut len));
        assert_eq!(std::slice::from_raw_parts(data, len), &[7, 0, 200]);
        let mut is_null = false;
        ok(kestrel_scan_batch_row_is_null(batch, col(9), &mut is_null));
        assert!(is_null);
        let mut ts_value = 0;
        let (_, message) = error(kestrel_scan_batch_row_get_unixtime_micros(
            batch,
            col(9),
            &mut ts_value,
        ));
        assert_eq!(message, "Illegal state: column ts is NULL");
        assert_eq!(
            take_string(kestrel_scan_batch_row_to_string(batch)),
            "(int32 k=1, int8 i8=-1, int16 i16=300, int64 i64=1099511627776, \
             string s=\"text\", bool b=true, float f=0.5, double d=2.5, \
             binary bin=\"\\x07\\x00\\xc8\", unixtime_micros ts=NULL)"
        );

        // past the end
        assert!(!kestrel_scan_batch_has_next(batch));
        kestrel_scan_batch_seek_next(batch);
        assert!(kestrel_scan_batch_row_to_string(batch).is_null());
        let (_, message) = error(kestrel_scan_batch_row_get_int32(batch, col(0), &mut i32_value));
        assert_eq!(message, "Illegal state: no current row");

        kestrel_scan_batch_free(batch);
        kestrel_scanner_free(scanner);
        kestrel_session_close(session);
        kestrel_table_close(table);
        kestrel_schema_free(schema);
        kestrel_client_free(client);
    }
}

#[test]
fn null_handles_yield_invalid_argument() {
    let name = c("t");
    unsafe {
        let mut exists = false;
        let (code, message) = error(kestrel_client_table_exists(
            ptr::null(),
            name.as_ptr(),
            &mut exists,
        ));
        assert_eq!(code, CLIENT_ERROR_CODE);
        assert_eq!(message, "Invalid argument: null client");
        let (_, message) = error(kestrel_session_flush(ptr::null_mut()));
        assert_eq!(message, "Invalid argument: null session");
        let (_, message) = error(kestrel_session_set_flush_mode(ptr::null_mut(), 0));
        assert_eq!(message, "Invalid argument: null session");
        assert!(kestrel_client_new_session(ptr::null()).is_null());
        assert!(kestrel_client_new_table_creator(ptr::null()).is_null());

        kestrel_client_free(ptr::null_mut());
        kestrel_session_close(ptr::null_mut());
        kestrel_table_creator_free(ptr::null_mut());
        kestrel_schema_free(ptr::null_mut());
        kestrel_string_free(ptr::null_mut());
    }
}

#[test]
fn invalid_flush_mode() {
    unsafe {
        let client = connect();
        let session = kestrel_client_new_session(client);
        let (_, message) = error(kestrel_session_set_flush_mode(session, 7));
        assert_eq!(message, "Invalid argument: unknown flush mode 7");
        kestrel_session_close(session);
        kestrel_client_free(client);
    }
}
