//! Foreign-key and primary-key metadata types.
//!
//! The backend answers two questions about any table: "what are its
//! primary-key columns?" and "which foreign keys touch it, in either
//! direction?". Both are plain reads of the database's information schema;
//! nothing here is cached across traversal steps, since schemas are
//! assumed not to change mid-run.

use serde::{Deserialize, Serialize};

/// One directed foreign-key edge: `table.table_column` references
/// `referenced_table.referenced_column`.
///
/// The forward relationships of table T are the edges where `table == T`;
/// the reverse relationships of T are the edges where
/// `referenced_table == T`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub table: String,
    pub table_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Ordered, deduplicated primary-key columns of a table.
///
/// `columns` is empty when the table declares no primary key. That is a
/// legal (if degraded) state, not an error — row identity then falls back
/// to whole-row equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyInfo {
    pub table: String,
    pub columns: Vec<String>,
}

impl PrimaryKeyInfo {
    pub fn has_key(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Keep the first edge per referencing column.
///
/// A column cannot forward-reference more than one table within a single
/// edge set, but the information schema can yield the same constraint
/// several times (composite constraints are reported per column pair).
/// Input order is the metadata query order, which the backend keeps
/// deterministic, so "first" is reproducible.
pub fn dedup_forward_edges(edges: Vec<ForeignKeyEdge>) -> Vec<ForeignKeyEdge> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(edges.len());
    for edge in edges {
        if seen.contains(&edge.table_column) {
            continue;
        }
        seen.push(edge.table_column.clone());
        out.push(edge);
    }
    out
}

/// Deduplicate column names preserving first-seen order.
pub fn ordered_unique(columns: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for col in columns {
        if !out.contains(&col) {
            out.push(col);
        }
    }
    out
}
