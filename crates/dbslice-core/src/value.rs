//! Loosely-typed row values.
//!
//! Sampling operates on tables whose shape is only discovered at runtime,
//! so fetched rows are represented as an ordered column → `SqlValue`
//! mapping rather than a static struct. A `RowRecord` is transient: it is
//! produced by one fetch and consumed by the engine in the same traversal
//! step; only the per-column fingerprint survives, inside the visited-set.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fetched row: column name → value, in result-set column order.
pub type RowRecord = IndexMap<String, SqlValue>;

/// A single scalar cell, tagged with the shape it came off the wire with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact numeric, kept in the server's textual form. MySQL coerces the
    /// string back to the column's DECIMAL type on bind, so no precision is
    /// lost round-tripping.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Canonical textual key for visited-set membership.
    ///
    /// Dedup compares the specific column value participating in a foreign
    /// key, never the whole row, so the fingerprint only has to be stable
    /// and injective per variant. Floats get a fixed precision so the same
    /// stored value always fingerprints identically.
    pub fn fingerprint(&self) -> String {
        match self {
            SqlValue::Null => "__NULL__".to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::UInt(u) => u.to_string(),
            SqlValue::Float(f) => format!("{:.10}", f),
            SqlValue::Decimal(d) => normalize_decimal(d),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Bytes(b) => hex_encode(b),
            SqlValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SqlValue::Time(t) => t.format("%H:%M:%S%.6f").to_string(),
            SqlValue::Json(j) => j.to_string(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::UInt(u) => write!(f, "{}", u),
            SqlValue::Float(fl) => write!(f, "{}", fl),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Bytes(b) => write!(f, "0x{}", hex_encode(b)),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts),
            SqlValue::Date(d) => write!(f, "{}", d),
            SqlValue::Time(t) => write!(f, "{}", t),
            SqlValue::Json(j) => write!(f, "{}", j),
        }
    }
}

/// Non-null value of `column` in `row`, if any.
pub fn non_null<'a>(row: &'a RowRecord, column: &str) -> Option<&'a SqlValue> {
    row.get(column).filter(|v| !v.is_null())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Strip trailing fractional zeros so the same stored number fingerprints
/// identically whatever scale the column declared ("19.50" vs "19.5000").
fn normalize_decimal(d: &str) -> String {
    if !d.contains('.') {
        return d.to_string();
    }
    d.trim_end_matches('0').trim_end_matches('.').to_string()
}
