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

//! Memcomparable encoding of key columns.
//!
//! The byte-wise order of encoded keys equals the order of the original
//! values: integers are big-endian with the sign bit flipped, and variable
//! length values that are not the last component escape `0x00` as
//! `0x00 0x01` and end with `0x00 0x00`.

use crate::error::{Error, Result};
use crate::row::Datum;
use bytes::BufMut;

pub struct KeyEncoder;

impl KeyEncoder {
    /// Encodes `values[idx]` for every idx in `indexes`, in that order.
    pub fn encode(values: &[Datum], indexes: &[usize]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for (pos, idx) in indexes.iter().enumerate() {
            let datum = values.get(*idx).ok_or_else(|| Error::IllegalArgument {
                message: format!("key column index {idx} out of range"),
            })?;
            Self::encode_datum(datum, pos + 1 == indexes.len(), &mut buf)?;
        }
        Ok(buf)
    }

    pub fn encode_datum(datum: &Datum, is_last: bool, buf: &mut Vec<u8>) -> Result<()> {
        match datum {
            Datum::Int8(v) => buf.put_u8((*v as u8) ^ 0x80),
            Datum::Int16(v) => buf.put_u16((*v as u16) ^ 0x8000),
            Datum::Int32(v) => buf.put_u32((*v as u32) ^ 0x8000_0000),
            Datum::Int64(v) | Datum::UnixtimeMicros(v) => {
                buf.put_u64((*v as u64) ^ 0x8000_0000_0000_0000)
            }
            Datum::String(v) => Self::encode_bytes(v.as_bytes(), is_last, buf),
            Datum::Binary(v) => Self::encode_bytes(v, is_last, buf),
            Datum::Null | Datum::Bool(_) | Datum::Float(_) | Datum::Double(_) => {
                return Err(Error::IllegalArgument {
                    message: format!("value {datum} cannot be part of a key"),
                });
            }
        }
        Ok(())
    }

    fn encode_bytes(bytes: &[u8], is_last: bool, buf: &mut Vec<u8>) {
        if is_last {
            buf.put_slice(bytes);
            return;
        }
        for &b in bytes {
            buf.put_u8(b);
            if b == 0 {
                buf.put_u8(1);
            }
        }
        buf.put_slice(&[0, 0]);
    }
}
