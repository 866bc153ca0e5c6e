//! Run-scoped dedup cache.
//!
//! The visited-set is the correctness backstop for cyclic schemas: each
//! `(table, column, value)` triple is resolved at most once per sampling
//! run, so `employees.manager_id → employees.id` chains and mutual
//! `A → B → A` references terminate instead of recursing forever.
//!
//! One instance lives for exactly one top-level run and is owned by the
//! engine — never a process-wide singleton, so concurrent runs in one
//! process cannot poison each other's state.

use std::collections::HashSet;

use crate::value::SqlValue;

/// Dedup state for a single sampling run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    /// `(table, column, fingerprint)` triples already resolved and queued
    /// for insertion.
    values: HashSet<(String, String, String)>,
    /// Child-fetch query signatures already expanded during reverse
    /// resolution. Kept separate from `values`: a row can legitimately be
    /// both a resolved parent and the filter of a child expansion.
    queries: HashSet<(String, String, String)>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `(table, column, value)` resolved. Returns `true` if this is
    /// the first time the triple is seen in this run.
    pub fn mark(&mut self, table: &str, column: &str, value: &SqlValue) -> bool {
        self.values.insert((
            table.to_string(),
            column.to_string(),
            value.fingerprint(),
        ))
    }

    pub fn contains(&self, table: &str, column: &str, value: &SqlValue) -> bool {
        self.values.contains(&(
            table.to_string(),
            column.to_string(),
            value.fingerprint(),
        ))
    }

    /// Mark a reverse-resolution fetch signature (`table` filtered on
    /// `column = value`) as expanded. Returns `true` on first sighting.
    pub fn mark_query(&mut self, table: &str, column: &str, value: &SqlValue) -> bool {
        self.queries.insert((
            table.to_string(),
            column.to_string(),
            value.fingerprint(),
        ))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
