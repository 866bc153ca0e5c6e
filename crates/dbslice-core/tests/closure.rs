//! Closure-engine tests against the in-memory backend.
//!
//! These exercise the traversal semantics hermetically: referential
//! closure, parent-before-child ordering, cycle termination, idempotence,
//! batch abort and cancellation. Live-database behavior is covered
//! separately by the env-gated MySQL integration test.

use dbslice_core::{AnchorSpec, CancelToken, DbSliceError, Sampler};
use dbslice_testutil::{
    cyclic_backend, employees_backend, int, null, shop_backend, text, MemoryBackend,
};

fn position(log: &[String], tag: &str) -> usize {
    log.iter()
        .position(|entry| entry == tag)
        .unwrap_or_else(|| panic!("'{}' not found in insert log {:?}", tag, log))
}

#[tokio::test]
async fn test_forward_closure_from_single_order() {
    let backend = shop_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("orders#id=7").unwrap())
        .await
        .unwrap();

    // Exactly the anchor row and its two parents, nothing else.
    assert_eq!(backend.dest_count("orders"), 1);
    assert_eq!(backend.dest_count("customers"), 1);
    assert_eq!(backend.dest_count("shipping_addresses"), 1);
    assert_eq!(backend.dest_rows("customers")[0]["id"], int(1));
    assert_eq!(backend.dest_rows("shipping_addresses")[0]["id"], int(2));
    assert!(backend.closure_holds());
}

#[tokio::test]
async fn test_parents_inserted_before_referencing_row() {
    let backend = shop_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("orders#id=7").unwrap())
        .await
        .unwrap();

    let log = backend.insert_order();
    let order = position(&log, "orders#id=7");
    assert!(position(&log, "customers#id=1") < order);
    assert!(position(&log, "shipping_addresses#id=2") < order);
}

#[tokio::test]
async fn test_reverse_closure_pulls_children_and_their_parents() {
    let backend = shop_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("customers#id=3").unwrap())
        .await
        .unwrap();

    // Customer 3, both of its orders, and each order's shipping address —
    // parents the anchor chain did not already cover.
    assert_eq!(backend.dest_count("customers"), 1);
    assert_eq!(backend.dest_count("orders"), 2);
    assert_eq!(backend.dest_count("shipping_addresses"), 2);
    assert!(backend.closure_holds());

    let log = backend.insert_order();
    assert!(position(&log, "customers#id=3") < position(&log, "orders#id=8"));
    assert!(position(&log, "customers#id=3") < position(&log, "orders#id=9"));
}

#[tokio::test]
async fn test_reverse_closure_processes_all_siblings() {
    // Both orders of customer 3 must be expanded, not just the first found.
    let backend = shop_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("customers#id=3").unwrap())
        .await
        .unwrap();

    let ids: Vec<_> = backend
        .dest_rows("orders")
        .iter()
        .map(|row| row["id"].clone())
        .collect();
    assert!(ids.contains(&int(8)));
    assert!(ids.contains(&int(9)));
}

#[tokio::test]
async fn test_self_referential_chain_resolves_all_ancestors_once() {
    let backend = employees_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("employees#id=4").unwrap())
        .await
        .unwrap();

    let rows = backend.dest_rows("employees");
    assert_eq!(rows.len(), 4);
    for id in 1..=4 {
        assert_eq!(
            rows.iter().filter(|r| r["id"] == int(id)).count(),
            1,
            "employee {} inserted exactly once",
            id
        );
    }
    assert!(backend.closure_holds());

    // Root of the chain lands first, anchor last.
    let log = backend.insert_order();
    assert!(position(&log, "employees#id=1") < position(&log, "employees#id=2"));
    assert!(position(&log, "employees#id=2") < position(&log, "employees#id=3"));
    assert!(position(&log, "employees#id=3") < position(&log, "employees#id=4"));
}

#[tokio::test]
async fn test_self_referential_chain_resolves_descendants() {
    let backend = employees_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("employees#id=1").unwrap())
        .await
        .unwrap();

    // Reverse edges walk the reporting chain downward to the leaf.
    assert_eq!(backend.dest_count("employees"), 4);
    assert!(backend.closure_holds());
}

#[tokio::test]
async fn test_diamond_shared_grandparent_resolved_once_and_first() {
    // orders → {customers, warehouses} → regions: the grandparent is
    // reachable through both branches but must land exactly once, before
    // either row that references it.
    let mut backend = MemoryBackend::new();
    backend.add_table("regions", &["id"]);
    backend.add_table("customers", &["id"]);
    backend.add_table("warehouses", &["id"]);
    backend.add_table("orders", &["id"]);
    backend.add_edge("customers", "region_id", "regions", "id");
    backend.add_edge("warehouses", "region_id", "regions", "id");
    backend.add_edge("orders", "customer_id", "customers", "id");
    backend.add_edge("orders", "warehouse_id", "warehouses", "id");
    backend.add_row("regions", &[("id", int(1))]);
    backend.add_row("customers", &[("id", int(1)), ("region_id", int(1))]);
    backend.add_row("warehouses", &[("id", int(1)), ("region_id", int(1))]);
    backend.add_row(
        "orders",
        &[("id", int(1)), ("customer_id", int(1)), ("warehouse_id", int(1))],
    );

    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("orders#id=1").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("regions"), 1);
    assert!(backend.closure_holds());

    let log = backend.insert_order();
    let region = position(&log, "regions#id=1");
    assert_eq!(log.iter().filter(|e| *e == "regions#id=1").count(), 1);
    assert!(region < position(&log, "customers#id=1"));
    assert!(region < position(&log, "warehouses#id=1"));
}

#[tokio::test]
async fn test_mutual_cycle_terminates() {
    let backend = cyclic_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("a#id=1").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("a"), 1);
    assert_eq!(backend.dest_count("b"), 1);
    assert!(backend.closure_holds());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let backend = shop_backend();
    let spec = AnchorSpec::parse("orders#id=7").unwrap();

    let mut first = Sampler::new(&backend, CancelToken::new());
    first.sample(&spec).await.unwrap();
    let counts = (
        backend.dest_count("orders"),
        backend.dest_count("customers"),
        backend.dest_count("shipping_addresses"),
    );

    // A fresh run (fresh visited-set) over the same anchor re-executes the
    // inserts; none may error or duplicate rows.
    let mut second = Sampler::new(&backend, CancelToken::new());
    second.sample(&spec).await.unwrap();
    assert_eq!(
        counts,
        (
            backend.dest_count("orders"),
            backend.dest_count("customers"),
            backend.dest_count("shipping_addresses"),
        )
    );
}

#[tokio::test]
async fn test_empty_anchor_selection_is_noop() {
    let backend = shop_backend();
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("customers#id=999").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("customers"), 0);
    assert_eq!(backend.dest_count("orders"), 0);
}

#[tokio::test]
async fn test_random_anchor_respects_limit() {
    let mut backend = MemoryBackend::new();
    backend.add_table("events", &["id"]);
    for id in 1..=8 {
        backend.add_row("events", &[("id", int(id))]);
    }
    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("events").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("events"), 5);
}

#[tokio::test]
async fn test_orphaned_forward_reference_is_skipped() {
    let mut backend = MemoryBackend::new();
    backend.add_table("customers", &["id"]);
    backend.add_table("orders", &["id"]);
    backend.add_edge("orders", "customer_id", "customers", "id");
    // customer 42 does not exist; the dangling value must not fail the run.
    backend.add_row("orders", &[("id", int(1)), ("customer_id", int(42))]);

    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("orders#id=1").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("orders"), 1);
    assert_eq!(backend.dest_count("customers"), 0);
}

#[tokio::test]
async fn test_failed_parent_batch_aborts_run_without_partial_branch() {
    let mut backend = shop_backend();
    backend.fail_inserts_into("customers");

    let mut sampler = Sampler::new(&backend, CancelToken::new());
    let err = sampler
        .sample(&AnchorSpec::parse("orders#id=7").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, DbSliceError::Other(_)));

    // The parent batch rolled back as a unit and the anchor insert never
    // ran, so the destination holds no dangling subset.
    assert_eq!(backend.dest_count("orders"), 0);
    assert_eq!(backend.dest_count("customers"), 0);
    assert_eq!(backend.dest_count("shipping_addresses"), 0);
}

#[tokio::test]
async fn test_cancellation_aborts_run() {
    let backend = shop_backend();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sampler = Sampler::new(&backend, cancel);
    let err = sampler
        .sample(&AnchorSpec::parse("orders#id=7").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, DbSliceError::Cancelled));
    assert_eq!(backend.dest_count("orders"), 0);
}

#[tokio::test]
async fn test_keyless_child_table_samples_best_effort() {
    let mut backend = MemoryBackend::new();
    backend.add_table("customers", &["id"]);
    backend.add_table("audit_log", &[]);
    backend.add_edge("audit_log", "customer_id", "customers", "id");
    backend.add_row("customers", &[("id", int(3))]);
    backend.add_row(
        "audit_log",
        &[("customer_id", int(3)), ("note", text("created")), ("extra", null())],
    );
    backend.add_row(
        "audit_log",
        &[("customer_id", int(3)), ("note", text("updated")), ("extra", null())],
    );

    let mut sampler = Sampler::new(&backend, CancelToken::new());
    sampler
        .sample(&AnchorSpec::parse("customers#id=3").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.dest_count("audit_log"), 2);
    assert!(backend.closure_holds());
}
