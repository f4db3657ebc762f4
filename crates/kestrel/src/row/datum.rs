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

use crate::error::{Error, Result};
use crate::metadata::DataType;
use crate::proto::PbDatum;
use crate::proto::pb_datum::Value;
use std::fmt::{Display, Formatter, Write};

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
    Bool(bool),
    Float(f32),
    Double(f64),
    Binary(Vec<u8>),
    UnixtimeMicros(i64),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// The column type this value belongs to; `None` for NULL.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Datum::Null => return None,
            Datum::Int8(_) => DataType::Int8,
            Datum::Int16(_) => DataType::Int16,
            Datum::Int32(_) => DataType::Int32,
            Datum::Int64(_) => DataType::Int64,
            Datum::String(_) => DataType::String,
            Datum::Bool(_) => DataType::Bool,
            Datum::Float(_) => DataType::Float,
            Datum::Double(_) => DataType::Double,
            Datum::Binary(_) => DataType::Binary,
            Datum::UnixtimeMicros(_) => DataType::UnixtimeMicros,
        })
    }

    pub fn to_pb(&self) -> PbDatum {
        let value = match self {
            Datum::Null => None,
            Datum::Int8(v) => Some(Value::Int8(*v as i32)),
            Datum::Int16(v) => Some(Value::Int16(*v as i32)),
            Datum::Int32(v) => Some(Value::Int32(*v)),
            Datum::Int64(v) => Some(Value::Int64(*v)),
            Datum::String(v) => Some(Value::String(v.clone())),
            Datum::Bool(v) => Some(Value::Bool(*v)),
            Datum::Float(v) => Some(Value::Float(*v)),
            Datum::Double(v) => Some(Value::Double(*v)),
            Datum::Binary(v) => Some(Value::Binary(v.clone())),
            Datum::UnixtimeMicros(v) => Some(Value::UnixtimeMicros(*v)),
        };
        PbDatum { value }
    }

    pub fn from_pb(pb: PbDatum) -> Result<Self> {
        let narrow = |value: i32, data_type: DataType| Error::IllegalArgument {
            message: format!("value {value} out of range for {data_type}"),
        };
        Ok(match pb.value {
            None => Datum::Null,
            Some(Value::Int8(v)) => {
                Datum::Int8(i8::try_from(v).map_err(|_| narrow(v, DataType::Int8))?)
            }
            Some(Value::Int16(v)) => {
                Datum::Int16(i16::try_from(v).map_err(|_| narrow(v, DataType::Int16))?)
            }
            Some(Value::Int32(v)) => Datum::Int32(v),
            Some(Value::Int64(v)) => Datum::Int64(v),
            Some(Value::String(v)) => Datum::String(v),
            Some(Value::Bool(v)) => Datum::Bool(v),
            Some(Value::Float(v)) => Datum::Float(v),
            Some(Value::Double(v)) => Datum::Double(v),
            Some(Value::Binary(v)) => Datum::Binary(v),
            Some(Value::UnixtimeMicros(v)) => Datum::UnixtimeMicros(v),
        })
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Null => f.write_str("NULL"),
            Datum::Int8(v) => write!(f, "{v}"),
            Datum::Int16(v) => write!(f, "{v}"),
            Datum::Int32(v) => write!(f, "{v}"),
            Datum::Int64(v) => write!(f, "{v}"),
            Datum::String(v) => write_escaped(f, v.as_bytes()),
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::Double(v) => write!(f, "{v}"),
            Datum::Binary(v) => write_escaped(f, v),
            Datum::UnixtimeMicros(v) => write_timestamp(f, *v),
        }
    }
}

/// Quoted, with quotes, backslashes and non-printable bytes escaped.
fn write_escaped(f: &mut Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    f.write_char('"')?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            0x20..=0x7e => f.write_char(b as char)?,
            _ => write!(f, "\\x{b:02x}")?,
        }
    }
    f.write_char('"')
}

/// `YYYY-MM-DDTHH:MM:SS.ffffffZ` in UTC.
fn write_timestamp(f: &mut Formatter<'_>, micros: i64) -> std::fmt::Result {
    let seconds = micros.div_euclid(MICROS_PER_SECOND);
    let fraction = micros.rem_euclid(MICROS_PER_SECOND);
    let days = seconds.div_euclid(SECONDS_PER_DAY);
    let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    write!(
        f,
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{fraction:06}Z",
        second_of_day / 3600,
        (second_of_day % 3600) / 60,
        second_of_day % 60
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

impl From<i8> for Datum {
    fn from(v: i8) -> Self {
        Datum::Int8(v)
    }
}

impl From<i16> for Datum {
    fn from(v: i16) -> Self {
        Datum::Int16(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int32(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Bool(v)
    }
}

impl From<f32> for Datum {
    fn from(v: f32) -> Self {
        Datum::Float(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Double(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl From<&[u8]> for Datum {
    fn from(v: &[u8]) -> Self {
        Datum::Binary(v.to_vec())
    }
}

impl From<Vec<u8>> for Datum {
    fn from(v: Vec<u8>) -> Self {
        Datum::Binary(v)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Datum::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_values() {
        assert_eq!(Datum::Null.to_string(), "NULL");
        assert_eq!(Datum::Int32(-7).to_string(), "-7");
        assert_eq!(Datum::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(
            Datum::Binary(vec![b'k', 0, 0xff]).to_string(),
            "\"k\\x00\\xff\""
        );
        assert_eq!(Datum::Bool(true).to_string(), "true");
    }

    #[test]
    fn display_timestamps() {
        assert_eq!(
            Datum::UnixtimeMicros(0).to_string(),
            "1970-01-01T00:00:00.000000Z"
        );
        assert_eq!(
            Datum::UnixtimeMicros(1_700_000_000_123_456).to_string(),
            "2023-11-14T22:13:20.123456Z"
        );
        assert_eq!(
            Datum::UnixtimeMicros(-1).to_string(),
            "1969-12-31T23:59:59.999999Z"
        );
    }

    #[test]
    fn pb_conversion_preserves_type() {
        for datum in [
            Datum::Null,
            Datum::Int8(-128),
            Datum::Int16(300),
            Datum::UnixtimeMicros(5),
            Datum::Binary(vec![1, 2]),
        ] {
            let back = Datum::from_pb(datum.to_pb()).unwrap();
            assert_eq!(back, datum);
            assert_eq!(back.data_type(), datum.data_type());
        }
    }

    #[test]
    fn pb_out_of_range_narrow_int_fails() {
        let pb = PbDatum {
            value: Some(Value::Int8(1000)),
        };
        assert!(Datum::from_pb(pb).is_err());
    }

    #[test]
    fn option_maps_to_null() {
        assert!(Datum::from(None::<i32>).is_null());
        assert_eq!(Datum::from(Some(3i64)), Datum::Int64(3));
    }
}
