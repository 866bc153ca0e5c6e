//! Database backend abstraction.
//!
//! The closure engine only needs a handful of primitives from the database:
//! catalog lookups, value-filtered row fetches, idempotent insert steps and
//! transactional batches, plus one-shot schema replication. They are
//! gathered behind `SampleBackend` so the engine can run against a live
//! MySQL server or the in-memory backend the tests use.

pub mod mysql;

use std::collections::HashSet;
use std::future::Future;

use crate::anchor::AnchorSpec;
use crate::catalog::{ForeignKeyEdge, PrimaryKeyInfo};
use crate::error::Result;
use crate::plan::InsertStep;
use crate::value::{RowRecord, SqlValue};

/// Query, insert and replication primitives over one source/destination
/// schema pair. One implementation serves exactly one sampling run's
/// schema pair; all methods are read-mostly and take `&self`.
pub trait SampleBackend: Send + Sync {
    /// Primary-key columns of `table` in the source schema. An empty
    /// column list means the table has no declared primary key.
    fn primary_key_of(&self, table: &str)
        -> impl Future<Output = Result<PrimaryKeyInfo>> + Send;

    /// Foreign keys held by `table` (it points outward at parents),
    /// deduplicated by referencing column, in deterministic metadata order.
    fn forward_edges(&self, table: &str)
        -> impl Future<Output = Result<Vec<ForeignKeyEdge>>> + Send;

    /// Foreign keys other tables point at `table` with (children pointing
    /// in). Not deduplicated: each referencing table/column pair is kept.
    fn reverse_edges(&self, table: &str)
        -> impl Future<Output = Result<Vec<ForeignKeyEdge>>> + Send;

    /// All source rows of `table` where `column = value`. An empty result
    /// is valid (orphaned reference or already-filtered row).
    fn fetch_by_value(
        &self,
        table: &str,
        column: &str,
        value: &SqlValue,
    ) -> impl Future<Output = Result<Vec<RowRecord>>> + Send;

    /// The starting row-set for a run. Empty result = no-op run.
    fn fetch_anchor(&self, spec: &AnchorSpec)
        -> impl Future<Output = Result<Vec<RowRecord>>> + Send;

    /// Execute one idempotent insert step outside any batch.
    fn apply_step(&self, step: &InsertStep) -> impl Future<Output = Result<()>> + Send;

    /// Execute a plan in a single transaction, in order. A mid-batch
    /// failure rolls the whole batch back before the error is returned.
    fn apply_batch(&self, steps: &[InsertStep]) -> impl Future<Output = Result<()>> + Send;

    /// Clone the source schema's structure into the destination schema.
    /// Tables named in `full_copy` also get their rows copied verbatim.
    fn replicate(&self, full_copy: &HashSet<String>)
        -> impl Future<Output = Result<()>> + Send;
}
