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

//! C bindings for the Kestrel client.
//!
//! Every entity is an opaque heap handle created by a `kestrel_*` factory and
//! released by exactly one matching free/close function. Fallible calls return
//! a `kestrel_status` pointer that is null on success; out-parameters are only
//! written when the call succeeds. See `include/kestrel.h` for the C view.

#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

mod client;
mod scanner;
mod schema;
mod session;
mod status;
mod table;
mod types;

pub use client::*;
pub use scanner::*;
pub use schema::*;
pub use session::*;
pub use status::*;
pub use table::*;
pub use types::*;

use std::sync::LazyLock;

/// Drives every blocking call made through the bindings. Handles never live here.
static RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("kestrel-c")
        .enable_all()
        .build()
        .unwrap_or_else(|e| panic!("cannot start the kestrel runtime: {e}"))
});
