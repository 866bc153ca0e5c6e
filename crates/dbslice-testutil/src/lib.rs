//! In-memory `SampleBackend` plus schema fixtures for engine tests.
//!
//! The memory backend mirrors the observable semantics the engine relies
//! on: value-filtered fetches, `INSERT IGNORE`-style idempotent steps, and
//! all-or-nothing batches. It additionally records the order of executed
//! inserts so tests can assert the parent-before-child invariant.

use std::collections::HashSet;
use std::sync::Mutex;

use indexmap::IndexMap;

use dbslice_core::anchor::{AnchorMode, AnchorSpec};
use dbslice_core::backend::SampleBackend;
use dbslice_core::catalog::{dedup_forward_edges, ForeignKeyEdge, PrimaryKeyInfo};
use dbslice_core::error::{DbSliceError, Result};
use dbslice_core::plan::InsertStep;
use dbslice_core::value::{RowRecord, SqlValue};

pub fn int(v: i64) -> SqlValue {
    SqlValue::Int(v)
}

pub fn text(v: &str) -> SqlValue {
    SqlValue::Text(v.to_string())
}

pub fn null() -> SqlValue {
    SqlValue::Null
}

pub fn make_row(cells: &[(&str, SqlValue)]) -> RowRecord {
    let mut row = RowRecord::new();
    for (column, value) in cells {
        row.insert(column.to_string(), value.clone());
    }
    row
}

#[derive(Debug, Default)]
struct MemTable {
    primary_key: Vec<String>,
    rows: Vec<RowRecord>,
}

/// In-memory source database plus destination sink.
#[derive(Default)]
pub struct MemoryBackend {
    tables: IndexMap<String, MemTable>,
    edges: Vec<ForeignKeyEdge>,
    /// Inserts into these tables fail, for batch-abort tests.
    fail_tables: HashSet<String>,
    dest: Mutex<IndexMap<String, Vec<RowRecord>>>,
    insert_log: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: &str, primary_key: &[&str]) {
        self.tables.insert(
            name.to_string(),
            MemTable {
                primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        );
    }

    pub fn add_row(&mut self, table: &str, cells: &[(&str, SqlValue)]) {
        self.tables
            .get_mut(table)
            .unwrap_or_else(|| panic!("fixture table '{}' not declared", table))
            .rows
            .push(make_row(cells));
    }

    pub fn add_edge(&mut self, table: &str, column: &str, ref_table: &str, ref_column: &str) {
        self.edges.push(ForeignKeyEdge {
            table: table.to_string(),
            table_column: column.to_string(),
            referenced_table: ref_table.to_string(),
            referenced_column: ref_column.to_string(),
        });
    }

    pub fn fail_inserts_into(&mut self, table: &str) {
        self.fail_tables.insert(table.to_string());
    }

    /// Rows committed to the destination copy of `table`.
    pub fn dest_rows(&self, table: &str) -> Vec<RowRecord> {
        self.dest
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dest_count(&self, table: &str) -> usize {
        self.dest_rows(table).len()
    }

    /// Executed insert statements, oldest first, as `table#col=v` tags.
    pub fn insert_order(&self) -> Vec<String> {
        self.insert_log.lock().unwrap().clone()
    }

    /// True when every non-null forward reference of every destination row
    /// has a matching destination row — the referential-closure property.
    pub fn closure_holds(&self) -> bool {
        let dest = self.dest.lock().unwrap();
        for (table, rows) in dest.iter() {
            for edge in self.edges.iter().filter(|e| &e.table == table) {
                for row in rows {
                    let Some(value) = row.get(&edge.table_column) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    let satisfied = dest
                        .get(&edge.referenced_table)
                        .map(|parents| {
                            parents.iter().any(|p| {
                                p.get(&edge.referenced_column)
                                    .is_some_and(|pv| pv.fingerprint() == value.fingerprint())
                            })
                        })
                        .unwrap_or(false);
                    if !satisfied {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn source_rows_matching(&self, step: &InsertStep) -> Vec<RowRecord> {
        let Some(table) = self.tables.get(&step.table) else {
            return Vec::new();
        };
        table
            .rows
            .iter()
            .filter(|row| {
                step.filter.iter().all(|(column, value)| {
                    row.get(column)
                        .is_some_and(|cell| cell.fingerprint() == value.fingerprint())
                })
            })
            .cloned()
            .collect()
    }

    fn stage_step(&self, step: &InsertStep, staged: &mut IndexMap<String, Vec<RowRecord>>) -> Result<()> {
        if self.fail_tables.contains(&step.table) {
            return Err(DbSliceError::Other(format!(
                "injected insert failure on {}",
                step.table
            )));
        }
        let matched = self.source_rows_matching(step);
        let committed = self.dest.lock().unwrap();
        let slot = staged.entry(step.table.clone()).or_default();
        for row in matched {
            let already_committed = committed
                .get(&step.table)
                .is_some_and(|rows| rows.contains(&row));
            if already_committed || slot.contains(&row) {
                continue;
            }
            slot.push(row);
        }
        drop(committed);
        self.insert_log.lock().unwrap().push(step_tag(step));
        Ok(())
    }

    fn commit(&self, staged: IndexMap<String, Vec<RowRecord>>) {
        let mut dest = self.dest.lock().unwrap();
        for (table, rows) in staged {
            dest.entry(table).or_default().extend(rows);
        }
    }
}

fn step_tag(step: &InsertStep) -> String {
    let filter: Vec<String> = step
        .filter
        .iter()
        .map(|(c, v)| format!("{}={}", c, v.fingerprint()))
        .collect();
    format!("{}#{}", step.table, filter.join(","))
}

impl SampleBackend for MemoryBackend {
    async fn primary_key_of(&self, table: &str) -> Result<PrimaryKeyInfo> {
        Ok(PrimaryKeyInfo {
            table: table.to_string(),
            columns: self
                .tables
                .get(table)
                .map(|t| t.primary_key.clone())
                .unwrap_or_default(),
        })
    }

    async fn forward_edges(&self, table: &str) -> Result<Vec<ForeignKeyEdge>> {
        let edges: Vec<ForeignKeyEdge> = self
            .edges
            .iter()
            .filter(|e| e.table == table)
            .cloned()
            .collect();
        Ok(dedup_forward_edges(edges))
    }

    async fn reverse_edges(&self, table: &str) -> Result<Vec<ForeignKeyEdge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.referenced_table == table)
            .cloned()
            .collect())
    }

    async fn fetch_by_value(
        &self,
        table: &str,
        column: &str,
        value: &SqlValue,
    ) -> Result<Vec<RowRecord>> {
        let Some(mem_table) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(mem_table
            .rows
            .iter()
            .filter(|row| {
                row.get(column)
                    .is_some_and(|cell| !cell.is_null() && cell.fingerprint() == value.fingerprint())
            })
            .cloned()
            .collect())
    }

    async fn fetch_anchor(&self, spec: &AnchorSpec) -> Result<Vec<RowRecord>> {
        let Some(table) = self.tables.get(&spec.table) else {
            return Ok(Vec::new());
        };
        let rows = match &spec.mode {
            // "Random" is deterministic in memory: the first `limit` rows.
            AnchorMode::Random { limit } => {
                table.rows.iter().take(*limit as usize).cloned().collect()
            }
            AnchorMode::Explicit { column, values } => table
                .rows
                .iter()
                .filter(|row| {
                    row.get(column)
                        .is_some_and(|cell| values.iter().any(|v| cell.fingerprint() == *v))
                })
                .cloned()
                .collect(),
        };
        Ok(rows)
    }

    async fn apply_step(&self, step: &InsertStep) -> Result<()> {
        let mut staged = IndexMap::new();
        self.stage_step(step, &mut staged)?;
        self.commit(staged);
        Ok(())
    }

    async fn apply_batch(&self, steps: &[InsertStep]) -> Result<()> {
        // All-or-nothing: stage every step, commit only if none failed.
        let mut staged = IndexMap::new();
        for step in steps {
            self.stage_step(step, &mut staged)?;
        }
        self.commit(staged);
        Ok(())
    }

    async fn replicate(&self, _full_copy: &HashSet<String>) -> Result<()> {
        Ok(())
    }
}

/// `customers(id PK)` ← `orders(id PK, customer_id FK, address_id FK)` →
/// `shipping_addresses(id PK)`, with a handful of rows.
pub fn shop_backend() -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    backend.add_table("customers", &["id"]);
    backend.add_table("shipping_addresses", &["id"]);
    backend.add_table("orders", &["id"]);
    backend.add_edge("orders", "customer_id", "customers", "id");
    backend.add_edge("orders", "address_id", "shipping_addresses", "id");

    for id in 1..=4 {
        backend.add_row("customers", &[("id", int(id)), ("name", text("c"))]);
        backend.add_row("shipping_addresses", &[("id", int(id)), ("city", text("x"))]);
    }
    backend.add_row("orders", &[("id", int(7)), ("customer_id", int(1)), ("address_id", int(2))]);
    backend.add_row("orders", &[("id", int(8)), ("customer_id", int(3)), ("address_id", int(3))]);
    backend.add_row("orders", &[("id", int(9)), ("customer_id", int(3)), ("address_id", int(4))]);
    backend
}

/// Self-referential `employees(id PK, manager_id FK→employees.id)` with a
/// four-level reporting chain 1 ← 2 ← 3 ← 4.
pub fn employees_backend() -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    backend.add_table("employees", &["id"]);
    backend.add_edge("employees", "manager_id", "employees", "id");
    backend.add_row("employees", &[("id", int(1)), ("manager_id", null())]);
    backend.add_row("employees", &[("id", int(2)), ("manager_id", int(1))]);
    backend.add_row("employees", &[("id", int(3)), ("manager_id", int(2))]);
    backend.add_row("employees", &[("id", int(4)), ("manager_id", int(3))]);
    backend
}

/// Mutually-cyclic `a(id PK, b_id FK→b.id)` and `b(id PK, a_id FK→a.id)`.
pub fn cyclic_backend() -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    backend.add_table("a", &["id"]);
    backend.add_table("b", &["id"]);
    backend.add_edge("a", "b_id", "b", "id");
    backend.add_edge("b", "a_id", "a", "id");
    backend.add_row("a", &[("id", int(1)), ("b_id", int(10))]);
    backend.add_row("b", &[("id", int(10)), ("a_id", int(1))]);
    backend
}
