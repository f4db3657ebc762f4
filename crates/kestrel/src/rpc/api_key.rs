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

/// Identifies the operation a request frame carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ApiKey {
    ConnectToMaster,
    CreateTable,
    DeleteTable,
    TableExists,
    GetTable,
    ListTables,
    Write,
    OpenScanner,
    ScanNext,
    CloseScanner,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(key: i16) -> Self {
        match key {
            1000 => ApiKey::ConnectToMaster,
            1001 => ApiKey::CreateTable,
            1002 => ApiKey::DeleteTable,
            1003 => ApiKey::TableExists,
            1004 => ApiKey::GetTable,
            1005 => ApiKey::ListTables,
            1010 => ApiKey::Write,
            1020 => ApiKey::OpenScanner,
            1021 => ApiKey::ScanNext,
            1022 => ApiKey::CloseScanner,
            _ => ApiKey::Unknown(key),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::ConnectToMaster => 1000,
            ApiKey::CreateTable => 1001,
            ApiKey::DeleteTable => 1002,
            ApiKey::TableExists => 1003,
            ApiKey::GetTable => 1004,
            ApiKey::ListTables => 1005,
            ApiKey::Write => 1010,
            ApiKey::OpenScanner => 1020,
            ApiKey::ScanNext => 1021,
            ApiKey::CloseScanner => 1022,
            ApiKey::Unknown(x) => x,
        }
    }
}
