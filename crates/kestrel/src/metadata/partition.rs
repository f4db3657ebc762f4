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

use crate::TabletId;
use crate::error::{Error, Result};
use crate::metadata::Schema;
use crate::proto::{PbHashDimension, PbPartitionSchema};
use crate::row::{Datum, KeyEncoder};
use crate::util::murmur_hash;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

pub const MIN_HASH_BUCKETS: i32 = 2;

/// Upper bound on the tablets one table may be split into.
pub const MAX_TABLETS_PER_TABLE: usize = 60;

/// Rows are spread over `num_buckets` buckets by hashing the listed key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashDimension {
    column_names: Vec<String>,
    num_buckets: i32,
    seed: u32,
}

impl HashDimension {
    pub fn new(column_names: Vec<String>, num_buckets: i32) -> Self {
        Self::with_seed(column_names, num_buckets, 0)
    }

    pub fn with_seed(column_names: Vec<String>, num_buckets: i32, seed: u32) -> Self {
        Self {
            column_names,
            num_buckets,
            seed,
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn num_buckets(&self) -> i32 {
        self.num_buckets
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn bucket(&self, schema: &Schema, values: &[Datum]) -> Result<i32> {
        if self.num_buckets <= 0 {
            return Err(Error::IllegalArgument {
                message: "num_buckets must be positive".to_string(),
            });
        }
        let indexes = self
            .column_names
            .iter()
            .map(|name| schema.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        let key = KeyEncoder::encode(values, &indexes)?;
        let hash = murmur_hash::hash_bytes_with_seed(&key, self.seed);
        Ok((hash % self.num_buckets as u32) as i32)
    }

    fn to_pb(&self) -> PbHashDimension {
        PbHashDimension {
            column_names: self.column_names.clone(),
            num_buckets: self.num_buckets,
            seed: self.seed,
        }
    }

    fn from_pb(pb: &PbHashDimension) -> Self {
        Self::with_seed(pb.column_names.clone(), pb.num_buckets, pb.seed)
    }
}

/// How a table's rows are assigned to tablets.
///
/// There is one tablet per combination of buckets across all dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSchema {
    hash_dimensions: Vec<HashDimension>,
}

impl PartitionSchema {
    pub fn new(hash_dimensions: Vec<HashDimension>) -> Self {
        Self { hash_dimensions }
    }

    pub fn hash_dimensions(&self) -> &[HashDimension] {
        &self.hash_dimensions
    }

    /// Saturates at `usize::MAX` for partitionings that never passed [`validate`](Self::validate).
    pub fn num_tablets(&self) -> usize {
        self.checked_num_tablets().unwrap_or(usize::MAX)
    }

    fn checked_num_tablets(&self) -> Option<usize> {
        self.hash_dimensions
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.num_buckets.max(1) as usize))
    }

    /// Checks the partitioning against the table schema.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.hash_dimensions.is_empty() {
            return Err(Error::IllegalArgument {
                message: "table partitioning must be specified using add_hash_partitions"
                    .to_string(),
            });
        }
        let mut used = HashSet::new();
        for dimension in &self.hash_dimensions {
            if dimension.column_names.is_empty() {
                return Err(Error::IllegalArgument {
                    message: "hash partitioning requires at least one column".to_string(),
                });
            }
            if dimension.num_buckets < MIN_HASH_BUCKETS {
                return Err(Error::IllegalArgument {
                    message: format!(
                        "must have at least {MIN_HASH_BUCKETS} hash buckets, got {}",
                        dimension.num_buckets
                    ),
                });
            }
            for name in &dimension.column_names {
                let idx = schema.column_index(name)?;
                if !schema.is_key_column(idx) {
                    return Err(Error::IllegalArgument {
                        message: format!(
                            "hash partition column {name} is not a primary key column"
                        ),
                    });
                }
                if !used.insert(name.as_str()) {
                    return Err(Error::IllegalArgument {
                        message: format!(
                            "hash partition column {name} is used in more than one dimension"
                        ),
                    });
                }
            }
        }
        match self.checked_num_tablets() {
            Some(n) if n <= MAX_TABLETS_PER_TABLE => Ok(()),
            requested => Err(Error::IllegalArgument {
                message: format!(
                    "requested {} tablets, the maximum is {MAX_TABLETS_PER_TABLE}",
                    requested.map_or_else(|| "too many".to_string(), |n| n.to_string())
                ),
            }),
        }
    }

    /// The tablet a full row (all columns, schema order) belongs to.
    pub fn tablet_for_row(&self, schema: &Schema, values: &[Datum]) -> Result<TabletId> {
        let mut tablet = 0usize;
        for dimension in &self.hash_dimensions {
            let bucket = dimension.bucket(schema, values)?;
            tablet = tablet * dimension.num_buckets as usize + bucket as usize;
        }
        Ok(tablet)
    }

    pub fn to_pb(&self) -> PbPartitionSchema {
        PbPartitionSchema {
            hash_dimensions: self.hash_dimensions.iter().map(HashDimension::to_pb).collect(),
        }
    }

    pub fn from_pb(pb: &PbPartitionSchema) -> Self {
        Self::new(pb.hash_dimensions.iter().map(HashDimension::from_pb).collect())
    }
}

impl Display for PartitionSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .hash_dimensions
            .iter()
            .map(|d| format!("HASH ({}) PARTITIONS {}", d.column_names.join(", "), d.num_buckets))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
