//! Dependency-closure sampling engine.
//!
//! Starting from an anchor row-set, the engine walks the foreign-key graph
//! in both directions and copies exactly the rows needed for the sampled
//! subset to satisfy every constraint it contains:
//!
//! - **forward** (parents): for each non-null FK value on a row, the
//!   referenced row is pulled in first, transitively, so parents land in
//!   the destination before anything that references them;
//! - **reverse** (children): every row referencing the anchor row is pulled
//!   in, together with its own missing parents and, transitively, its own
//!   children.
//!
//! Edges are discovered dynamically from the catalog on every step, not
//! precomputed as a static graph. Termination on cyclic or self-referential
//! schemas rests on the run-scoped [`VisitedSet`]: each
//! `(table, column, value)` triple is resolved at most once, and each
//! child-fetch signature is expanded at most once.
//!
//! Traversal uses explicit work-lists rather than call-stack recursion, so
//! memory stays bounded on deep chains and cancellation is checked at every
//! step. The walk is strictly sequential: parent-before-child insert order
//! is a correctness requirement, not a performance choice.

use tracing::{debug, info};

use crate::anchor::AnchorSpec;
use crate::backend::SampleBackend;
use crate::cancel::CancelToken;
use crate::catalog::ForeignKeyEdge;
use crate::error::Result;
use crate::plan::InsertStep;
use crate::value::{non_null, RowRecord, SqlValue};
use crate::visited::VisitedSet;

/// One sampling run over a source/destination schema pair.
///
/// The visited-set lives inside the sampler, so dedup state is scoped to
/// exactly one run; build a fresh `Sampler` per anchor invocation.
pub struct Sampler<'a, B: SampleBackend> {
    backend: &'a B,
    visited: VisitedSet,
    cancel: CancelToken,
}

/// A pending parent-resolution action.
enum Frame {
    /// Fetch the rows of `table` where `column = value` and resolve their
    /// own parents before emitting them.
    Expand {
        table: String,
        column: String,
        value: SqlValue,
    },
    /// Append an already-resolved row's insert to the plan.
    Emit(InsertStep),
}

/// A pending child fetch: rows of `table` where `column = value`.
struct ChildFetch {
    table: String,
    column: String,
    value: SqlValue,
}

impl<'a, B: SampleBackend> Sampler<'a, B> {
    pub fn new(backend: &'a B, cancel: CancelToken) -> Self {
        Self {
            backend,
            visited: VisitedSet::new(),
            cancel,
        }
    }

    /// Run the full closure for one anchor spec.
    ///
    /// Succeeds only if every step for every anchor row completed. On
    /// failure the run aborts; batches already committed stay committed
    /// (each is independently self-consistent), and the error propagates.
    pub async fn sample(&mut self, spec: &AnchorSpec) -> Result<()> {
        self.cancel.check()?;
        let anchors = self.backend.fetch_anchor(spec).await?;
        if anchors.is_empty() {
            info!(table = %spec.table, "anchor selection matched no rows; nothing to sample");
            return Ok(());
        }
        info!(table = %spec.table, rows = anchors.len(), "sampling from anchor");

        let pk = self.backend.primary_key_of(&spec.table).await?;
        for anchor in &anchors {
            self.cancel.check()?;
            self.resolve_parents(anchor, &spec.table).await?;

            // Mark the anchor's key before inserting so children whose
            // forward edges point back at it do not re-resolve it.
            self.mark_row_key(&spec.table, &pk.columns, anchor);
            let step = InsertStep::for_row(&spec.table, &pk, anchor);
            self.backend.apply_step(&step).await?;

            self.resolve_children(anchor, &spec.table).await?;
        }
        debug!(resolved = self.visited.len(), "run complete");
        Ok(())
    }

    /// Pull in every row the given row references, transitively, parents
    /// first, then execute the whole branch as one transaction.
    pub async fn resolve_parents(&mut self, row: &RowRecord, table: &str) -> Result<()> {
        let plan = self.plan_parents(row, table).await?;
        if plan.is_empty() {
            return Ok(());
        }
        debug!(table, steps = plan.len(), "executing parent batch");
        self.backend.apply_batch(&plan).await
    }

    /// Depth-first expansion of the row's forward edges into an ordered
    /// insert plan.
    ///
    /// Popping an `Expand` frame fetches the referenced rows and pushes,
    /// per row, an `Emit` frame below the row's own unvisited `Expand`
    /// frames. LIFO order then guarantees every emit for a parent pops
    /// before the emit of the row that references it, so the collected
    /// plan is already in parent-before-child order.
    async fn plan_parents(&mut self, row: &RowRecord, table: &str) -> Result<Vec<InsertStep>> {
        let mut plan: Vec<InsertStep> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        let edges = self.backend.forward_edges(table).await?;
        self.push_expansions(&mut stack, &edges, row);

        while let Some(frame) = stack.pop() {
            self.cancel.check()?;
            match frame {
                Frame::Emit(step) => plan.push(step),
                Frame::Expand {
                    table,
                    column,
                    value,
                } => {
                    let rows = self.backend.fetch_by_value(&table, &column, &value).await?;
                    // An orphaned FK value fetches nothing; that is "zero
                    // rows to insert", not an error.
                    if rows.is_empty() {
                        debug!(table = %table, column = %column, "referenced row absent; skipping");
                        continue;
                    }
                    let pk = self.backend.primary_key_of(&table).await?;
                    let edges = self.backend.forward_edges(&table).await?;
                    for parent in &rows {
                        stack.push(Frame::Emit(InsertStep::for_row(&table, &pk, parent)));
                        self.push_expansions(&mut stack, &edges, parent);
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Pull in every row referencing the given row, transitively over the
    /// full downstream closure.
    ///
    /// Every child is processed, not just the first found; each child has
    /// its own missing parents resolved before it is inserted, and its
    /// insert lands before its own children are fetched, so the
    /// parent-before-child invariant holds across batches too.
    pub async fn resolve_children(&mut self, row: &RowRecord, table: &str) -> Result<()> {
        let mut queue: Vec<ChildFetch> = Vec::new();
        let edges = self.backend.reverse_edges(table).await?;
        self.push_child_fetches(&mut queue, &edges, row);

        let mut next = 0;
        while next < queue.len() {
            self.cancel.check()?;
            let ChildFetch {
                table: child_table,
                column,
                value,
            } = &queue[next];
            let child_table = child_table.clone();
            let rows = self
                .backend
                .fetch_by_value(&child_table, column, value)
                .await?;
            next += 1;
            if rows.is_empty() {
                continue;
            }

            debug!(table = %child_table, rows = rows.len(), "expanding referencing rows");
            let pk = self.backend.primary_key_of(&child_table).await?;
            let reverse = self.backend.reverse_edges(&child_table).await?;
            for child in &rows {
                self.resolve_parents(child, &child_table).await?;
                self.mark_row_key(&child_table, &pk.columns, child);
                let step = InsertStep::for_row(&child_table, &pk, child);
                self.backend.apply_step(&step).await?;
                self.push_child_fetches(&mut queue, &reverse, child);
            }
        }
        Ok(())
    }

    /// Queue `Expand` frames for the row's forward edges whose referenced
    /// key has not been resolved yet in this run.
    fn push_expansions(&mut self, stack: &mut Vec<Frame>, edges: &[ForeignKeyEdge], row: &RowRecord) {
        for edge in edges {
            if let Some(value) = non_null(row, &edge.table_column) {
                if self
                    .visited
                    .mark(&edge.referenced_table, &edge.referenced_column, value)
                {
                    stack.push(Frame::Expand {
                        table: edge.referenced_table.clone(),
                        column: edge.referenced_column.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
    }

    /// Queue child fetches for the row's reverse edges, deduplicated by
    /// fetch signature so shared descendants are expanded once.
    fn push_child_fetches(
        &mut self,
        queue: &mut Vec<ChildFetch>,
        edges: &[ForeignKeyEdge],
        row: &RowRecord,
    ) {
        for edge in edges {
            if let Some(value) = non_null(row, &edge.referenced_column) {
                if self
                    .visited
                    .mark_query(&edge.table, &edge.table_column, value)
                {
                    queue.push(ChildFetch {
                        table: edge.table.clone(),
                        column: edge.table_column.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
    }

    /// Record a row's key identity so later forward resolution toward this
    /// row short-circuits. Keyless tables have nothing to mark; the query
    /// signature dedup still bounds their expansion.
    fn mark_row_key(&mut self, table: &str, pk_columns: &[String], row: &RowRecord) {
        for column in pk_columns {
            if let Some(value) = non_null(row, column) {
                self.visited.mark(table, column, value);
            }
        }
    }

    /// Number of `(table, column, value)` triples resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.visited.len()
    }
}
