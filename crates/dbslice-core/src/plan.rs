//! Insert plan entries.
//!
//! The engine never ships row payloads back to the database; an insert is
//! expressed as "copy the source rows matching this filter into the
//! destination, ignoring rows whose key is already there". That keeps every
//! step idempotent — the same parent row can be reached through several
//! paths before its visited-set entry lands, and re-executing the step must
//! neither error nor duplicate.

use tracing::warn;

use crate::catalog::PrimaryKeyInfo;
use crate::value::{RowRecord, SqlValue};

/// One queued idempotent insert against the destination schema.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStep {
    pub table: String,
    /// Conjunctive column = value filter identifying the row(s) in the
    /// source table. Compared null-safe, so a NULL cell in a keyless row
    /// still matches itself.
    pub filter: Vec<(String, SqlValue)>,
    /// False when the table has no primary key and identity degraded to
    /// whole-row equality.
    pub keyed: bool,
}

impl InsertStep {
    /// Build the step that copies `row` of `table` into the destination.
    ///
    /// Identity is the table's primary key (all of its columns, so
    /// composite keys select exactly one row). Tables without a declared
    /// primary key fall back to matching every column of the row; that is
    /// best-effort and loudly flagged, since duplicate unkeyed rows
    /// collapse under it.
    pub fn for_row(table: &str, pk: &PrimaryKeyInfo, row: &RowRecord) -> Self {
        if pk.has_key() {
            let filter: Vec<(String, SqlValue)> = pk
                .columns
                .iter()
                .filter_map(|col| row.get(col).map(|v| (col.clone(), v.clone())))
                .collect();
            if filter.len() == pk.columns.len() {
                return Self {
                    table: table.to_string(),
                    filter,
                    keyed: true,
                };
            }
        }
        warn!(
            table,
            "table has no usable primary key; degrading row identity to whole-row equality"
        );
        Self {
            table: table.to_string(),
            filter: row.iter().map(|(c, v)| (c.clone(), v.clone())).collect(),
            keyed: false,
        }
    }
}
