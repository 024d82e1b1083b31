use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{DbmsError, Result};
use crate::schema::{ColumnInfo, ColumnKind};

/// A single cell read from, or written to, an arbitrary table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

impl CellValue {
    pub fn from_sql(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Real(f),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert a form field into a value suitable for `column`.
    ///
    /// Text columns keep whitespace as typed; only an empty field means NULL
    /// for them.
    pub fn parse_input(column: &ColumnInfo, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let blank = match column.kind {
            ColumnKind::Text | ColumnKind::Untyped => raw.is_empty(),
            _ => trimmed.is_empty(),
        };
        if blank {
            return match column.kind {
                _ if !column.not_null => Ok(CellValue::Null),
                ColumnKind::Text | ColumnKind::Untyped => Ok(CellValue::Text(raw.to_string())),
                ColumnKind::DateTime | ColumnKind::Date | ColumnKind::Time => {
                    Err(DbmsError::InvalidDatetime(column.name.clone()))
                }
                _ => Err(invalid(column, raw)),
            };
        }

        match column.kind {
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(CellValue::Integer)
                .map_err(|_| invalid(column, raw)),
            ColumnKind::Real => trimmed
                .parse::<f64>()
                .map(CellValue::Real)
                .map_err(|_| invalid(column, raw)),
            // NUMERIC affinity keeps text that does not look like a number
            ColumnKind::Numeric => Ok(if let Ok(i) = trimmed.parse::<i64>() {
                CellValue::Integer(i)
            } else if let Some(f) = trimmed.parse::<f64>().ok().filter(|f| f.is_finite()) {
                CellValue::Real(f)
            } else {
                CellValue::Text(raw.to_string())
            }),
            ColumnKind::Boolean => parse_bool(trimmed)
                .map(|b| CellValue::Integer(b as i64))
                .ok_or_else(|| invalid(column, raw)),
            ColumnKind::DateTime => parse_datetime(trimmed)
                .map(|dt| CellValue::Text(format_datetime(&dt)))
                .ok_or_else(|| DbmsError::InvalidDatetime(column.name.clone())),
            ColumnKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|d| CellValue::Text(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| DbmsError::InvalidDatetime(column.name.clone())),
            ColumnKind::Time => parse_time(trimmed)
                .map(|t| CellValue::Text(format_time(&t)))
                .ok_or_else(|| DbmsError::InvalidDatetime(column.name.clone())),
            ColumnKind::Blob => Err(invalid(column, raw)),
            ColumnKind::Text | ColumnKind::Untyped => Ok(CellValue::Text(raw.to_string())),
        }
    }
}

fn invalid(column: &ColumnInfo, raw: &str) -> DbmsError {
    DbmsError::InvalidValue {
        column: column.name.clone(),
        value: raw.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an ISO-8601 style datetime, normalising offsets to UTC.
///
/// A bare `YYYY-MM-DD` is accepted as midnight of that day.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let with_offset = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .map(|s| format!("{s}+00:00"));
    let candidate = with_offset.as_deref().unwrap_or(raw);

    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            CellValue::Null => ValueRef::Null,
            CellValue::Integer(i) => ValueRef::Integer(*i),
            CellValue::Real(f) => ValueRef::Real(*f),
            CellValue::Text(s) => ValueRef::Text(s.as_bytes()),
            CellValue::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Real(r) => write!(f, "{r}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Real(r) => serializer.serialize_f64(*r),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Blob(b) => serializer.serialize_str(&format!("<{} bytes>", b.len())),
        }
    }
}
