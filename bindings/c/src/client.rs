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

use kestrel::client::{ClientBuilder, KestrelClient, TableCreator};
use std::ffi::c_char;
use std::ptr;
use std::time::Duration;

use crate::RUNTIME;
use crate::schema::kestrel_schema;
use crate::session::kestrel_session;
use crate::status::{BridgeResult, kestrel_status, with_status};
use crate::table::kestrel_table;
use crate::types::{
    free_handle, handle_mut, handle_ref, require_out, str_arg, str_array_arg, write_handle,
};

pub struct kestrel_client_builder {
    inner: ClientBuilder,
}

pub struct kestrel_client {
    inner: KestrelClient,
}

/// Single use: `create` consumes the command, the handle stays to be freed.
pub struct kestrel_table_creator {
    inner: Option<TableCreator>,
}

impl kestrel_table_creator {
    fn creator(&mut self) -> BridgeResult<&mut TableCreator> {
        self.inner
            .as_mut()
            .ok_or_else(|| kestrel_status::illegal_state("table creator has already been used"))
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kestrel_client_builder_create() -> *mut kestrel_client_builder {
    Box::into_raw(Box::new(kestrel_client_builder {
        inner: ClientBuilder::new(),
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_builder_free(builder: *mut kestrel_client_builder) {
    unsafe { free_handle(builder) }
}

/// Appends a master address; addresses are only checked by `build`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_builder_add_master_server_addr(
    builder: *mut kestrel_client_builder,
    address: *const c_char,
) -> *mut kestrel_status {
    with_status(|| {
        let builder = unsafe { handle_mut(builder, "client builder") }?;
        let address = unsafe { str_arg(address, "address") }?;
        builder.inner = std::mem::take(&mut builder.inner).add_master_server_addr(address);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_builder_set_rpc_timeout_ms(
    builder: *mut kestrel_client_builder,
    timeout_ms: u64,
) -> *mut kestrel_status {
    with_status(|| {
        let builder = unsafe { handle_mut(builder, "client builder") }?;
        builder.inner =
            std::mem::take(&mut builder.inner).rpc_timeout(Duration::from_millis(timeout_ms));
        Ok(())
    })
}

/// Connects to the cluster. The builder stays usable and independent of the client.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_builder_build(
    builder: *const kestrel_client_builder,
    out_client: *mut *mut kestrel_client,
) -> *mut kestrel_status {
    with_status(|| {
        let builder = unsafe { handle_ref(builder, "client builder") }?;
        require_out(out_client, "client out-parameter")?;
        let client = RUNTIME.block_on(builder.inner.build())?;
        unsafe { write_handle(out_client, kestrel_client { inner: client }) };
        Ok(())
    })
}

/// Tables, sessions and creators made by this client keep it alive.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_free(client: *mut kestrel_client) {
    unsafe { free_handle(client) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_new_table_creator(
    client: *const kestrel_client,
) -> *mut kestrel_table_creator {
    match unsafe { client.as_ref() } {
        Some(client) => Box::into_raw(Box::new(kestrel_table_creator {
            inner: Some(client.inner.new_table_creator()),
        })),
        None => ptr::null_mut(),
    }
}

/// A missing table is `false` with a null status.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_table_exists(
    client: *const kestrel_client,
    table_name: *const c_char,
    out_exists: *mut bool,
) -> *mut kestrel_status {
    with_status(|| {
        let client = unsafe { handle_ref(client, "client") }?;
        let table_name = unsafe { str_arg(table_name, "table name") }?;
        require_out(out_exists, "exists out-parameter")?;
        let exists = RUNTIME.block_on(client.inner.table_exists(table_name))?;
        unsafe { *out_exists = exists };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_open_table(
    client: *const kestrel_client,
    table_name: *const c_char,
    out_table: *mut *mut kestrel_table,
) -> *mut kestrel_status {
    with_status(|| {
        let client = unsafe { handle_ref(client, "client") }?;
        let table_name = unsafe { str_arg(table_name, "table name") }?;
        require_out(out_table, "table out-parameter")?;
        let table = RUNTIME.block_on(client.inner.open_table(table_name))?;
        unsafe { write_handle(out_table, kestrel_table::new(table)) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_delete_table(
    client: *const kestrel_client,
    table_name: *const c_char,
) -> *mut kestrel_status {
    with_status(|| {
        let client = unsafe { handle_ref(client, "client") }?;
        let table_name = unsafe { str_arg(table_name, "table name") }?;
        RUNTIME.block_on(client.inner.delete_table(table_name))?;
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_client_new_session(
    client: *const kestrel_client,
) -> *mut kestrel_session {
    match unsafe { client.as_ref() } {
        Some(client) => Box::into_raw(Box::new(kestrel_session::new(client.inner.new_session()))),
        None => ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_creator_free(creator: *mut kestrel_table_creator) {
    unsafe { free_handle(creator) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_creator_set_table_name(
    creator: *mut kestrel_table_creator,
    table_name: *const c_char,
) -> *mut kestrel_status {
    with_status(|| {
        let creator = unsafe { handle_mut(creator, "table creator") }?;
        let table_name = unsafe { str_arg(table_name, "table name") }?;
        creator.creator()?.table_name(table_name);
        Ok(())
    })
}

/// Copies the schema; the schema handle stays owned by the caller.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_creator_set_schema(
    creator: *mut kestrel_table_creator,
    schema: *const kestrel_schema,
) -> *mut kestrel_status {
    with_status(|| {
        let creator = unsafe { handle_mut(creator, "table creator") }?;
        let schema = unsafe { handle_ref(schema, "schema") }?;
        creator.creator()?.schema(schema.schema());
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_creator_add_hash_partitions(
    creator: *mut kestrel_table_creator,
    column_names: *const *const c_char,
    num_columns: usize,
    num_buckets: i32,
) -> *mut kestrel_status {
    with_status(|| {
        let creator = unsafe { handle_mut(creator, "table creator") }?;
        let columns = unsafe { str_array_arg(column_names, num_columns, "column names") }?;
        creator
            .creator()?
            .add_hash_partitions(columns, num_buckets);
        Ok(())
    })
}

/// Runs the command. The creator is used up whatever the outcome.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_table_creator_create(
    creator: *mut kestrel_table_creator,
) -> *mut kestrel_status {
    with_status(|| {
        let creator = unsafe { handle_mut(creator, "table creator") }?;
        let command = creator
            .inner
            .take()
            .ok_or_else(|| kestrel_status::illegal_state("table creator has already been used"))?;
        RUNTIME.block_on(command.create())?;
        Ok(())
    })
}
