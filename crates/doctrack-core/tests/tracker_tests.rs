//! Change Tracker Tests
//!
//! ## Scenarios Covered
//!
//! 1. ADDED aggregates compile to parent-first CREATE chains
//! 2. DELETED aggregates compile to child-first DELETE chains
//! 3. MODIFIED aggregates compile to minimal UPDATE / CREATE / DELETE commands
//! 4. Transition guard and null handling
//! 5. Error propagation: compile errors before execution, dialect errors unchanged

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{registry, sample_store, Category, Product, Store, Variant};
use doctrack_core::dialect::Dialect;
use doctrack_core::{
    AbstractCommand, ArrayOperation, ChangeTracker, ChangeType, CompileMode, DocPath,
    DocTrackError, ExError, ExErrorKind, Operation, RecordingDialect, Snapshot, TrackerOptions,
};

fn tracker() -> ChangeTracker<RecordingDialect> {
    ChangeTracker::new(registry(), RecordingDialect::new())
}

fn summary(commands: &[AbstractCommand]) -> Vec<(Operation, String, u32)> {
    commands
        .iter()
        .map(|c| (c.operation(), c.path().to_string(), c.level()))
        .collect()
}

fn reference(path: &str) -> Snapshot {
    Snapshot::DocumentReference(DocPath::parse(path).unwrap())
}

#[test]
fn test_added_store_creates_parent_before_children() {
    // GIVEN a new store owning a product that references a category
    let mut product = Product::new("P", "Widget", 1);
    product.category = Some(Category {
        id: "C".to_string(),
        name: "Tools".to_string(),
    });
    let mut store = Store::new("S", "Main");
    store.products.push(product);

    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Added).unwrap();

    // WHEN changes are saved
    tracker.save_changes(&mut ()).unwrap();

    // THEN the store is created before the product and the category is only referenced
    let batches = tracker.dialect().batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        summary(&batches[0]),
        vec![
            (Operation::Create, "stores/S".to_string(), 0),
            (Operation::Create, "stores/S/products/P".to_string(), 1),
        ]
    );
    assert_eq!(batches[0][1].data()["category"], reference("categories/C"));
    assert!(!batches[0][0].data().contains_key("products"));
}

#[test]
fn test_deleted_store_reverses_create_order() {
    // GIVEN a persisted store with a product and a variant, tracked as DELETED
    let mut tracker = tracker();
    tracker
        .set_entity(&sample_store(), ChangeType::Deleted)
        .unwrap();

    // WHEN changes are saved
    tracker.save_changes(&mut ()).unwrap();

    // THEN children are deleted before parents and no command carries data
    let commands = &tracker.dialect().batches()[0];
    assert_eq!(
        summary(commands),
        vec![
            (
                Operation::Delete,
                "stores/s1/products/p1/variants/v1".to_string(),
                2
            ),
            (Operation::Delete, "stores/s1/products/p1".to_string(), 1),
            (Operation::Delete, "stores/s1".to_string(), 0),
        ]
    );
    assert!(commands.iter().all(|c| c.data().is_empty()));
}

#[test]
fn test_modified_list_item_and_added_item() {
    // GIVEN a store whose product p1 has qty 1
    let mut store = Store::new("s1", "Main");
    store.products.push(Product::new("p1", "Widget", 1));
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN p1's qty becomes 2 and p2 is added
    store.products[0].qty = 2;
    store.products.push(Product::new("p2", "Gadget", 5));
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut ()).unwrap();

    // THEN p2 gets a CREATE and p1 a one-field UPDATE; the store itself is untouched
    let commands = &tracker.dialect().batches()[0];
    assert_eq!(
        summary(commands),
        vec![
            (Operation::Create, "stores/s1/products/p2".to_string(), 1),
            (Operation::Update, "stores/s1/products/p1".to_string(), 1),
        ]
    );
    assert_eq!(commands[0].data()["name"], Snapshot::from("Gadget"));
    assert_eq!(commands[1].data().len(), 1);
    assert_eq!(commands[1].data()["qty"], Snapshot::Int(2));
}

#[test]
fn test_scalar_array_minimal_mutation() {
    // GIVEN a store tagged ["a", "b"]
    let mut store = Store::new("s1", "Main");
    store.tags = vec!["a".to_string(), "b".to_string()];
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN the tags become ["b", "c"]
    store.tags = vec!["b".to_string(), "c".to_string()];
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut ()).unwrap();

    // THEN the root UPDATE carries UNION_REMOVE and does not rewrite the field
    let commands = &tracker.dialect().batches()[0];
    assert_eq!(commands.len(), 1);
    assert!(!commands[0].data().contains_key("tags"));
    assert_eq!(
        commands[0].array_operations().unwrap()["tags"],
        ArrayOperation::UnionRemove {
            union: vec![Snapshot::from("c")],
            remove: vec![Snapshot::from("a")],
        }
    );
}

#[test]
fn test_removed_product_deletes_its_subtree() {
    // GIVEN the sample store with p1 owning v1
    let mut store = sample_store();
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN p1 is removed from the store
    store.products.clear();
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    let batches = tracker.pending_batches().unwrap();

    // THEN both p1 and v1 receive DELETE commands
    assert_eq!(
        summary(&batches[0].commands),
        vec![
            (Operation::Delete, "stores/s1/products/p1".to_string(), 1),
            (
                Operation::Delete,
                "stores/s1/products/p1/variants/v1".to_string(),
                2
            ),
        ]
    );
}

#[test]
fn test_removed_subtree_executes_children_first() {
    // GIVEN the sample store with p1 owning v1
    let mut store = sample_store();
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN p1 is removed, the store renamed, and saved
    store.products.clear();
    store.name = "Outlet".to_string();
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut ()).unwrap();

    // THEN the store UPDATE runs first and v1 is deleted before p1
    assert_eq!(
        summary(&tracker.dialect().batches()[0]),
        vec![
            (Operation::Update, "stores/s1".to_string(), 0),
            (
                Operation::Delete,
                "stores/s1/products/p1/variants/v1".to_string(),
                2
            ),
            (Operation::Delete, "stores/s1/products/p1".to_string(), 1),
        ]
    );
}

#[test]
fn test_repeated_tags_round_trip_through_set() {
    // GIVEN a store tagged ["a", "b"]
    let mut store = Store::new("s1", "Main");
    store.tags = vec!["a".to_string(), "b".to_string()];
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN a tag is repeated
    store.tags = vec!["b".to_string(), "c".to_string(), "c".to_string()];
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut ()).unwrap();

    // THEN the whole list is written, duplicates included
    let commands = &tracker.dialect().batches()[0];
    assert_eq!(
        commands[0].array_operations().unwrap()["tags"],
        ArrayOperation::Set(vec![
            Snapshot::from("b"),
            Snapshot::from("c"),
            Snapshot::from("c")
        ])
    );
}

#[test]
fn test_id_with_slash_is_rejected_at_registration() {
    let mut tracker = tracker();
    let err = tracker
        .set_entity(&Store::new("a/b", "Main"), ChangeType::Added)
        .unwrap_err();

    assert!(matches!(err, DocTrackError::InvalidPath { .. }));
    assert!(tracker.is_empty());
}

#[test]
fn test_nested_variant_change_targets_variant_document() {
    // GIVEN the sample store
    let mut store = sample_store();
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN v1's colour changes
    store.products[0].variants[0].color = "blue".to_string();
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    let batches = tracker.pending_batches().unwrap();

    // THEN a single UPDATE addresses the variant at level 2
    assert_eq!(
        summary(&batches[0].commands),
        vec![(
            Operation::Update,
            "stores/s1/products/p1/variants/v1".to_string(),
            2
        )]
    );
    assert_eq!(
        batches[0].commands[0].data()["color"],
        Snapshot::from("blue")
    );
}

#[test]
fn test_transition_guard_keeps_state() {
    // GIVEN a store tracked as DELETED
    let store = sample_store();
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Deleted).unwrap();

    // WHEN it is re-registered as MODIFIED
    let err = tracker
        .set_entity(&store, ChangeType::Modified)
        .unwrap_err();

    // THEN the transition is rejected and the state stays DELETED
    assert!(matches!(
        err,
        DocTrackError::InvalidStateTransition {
            from: ChangeType::Deleted,
            to: ChangeType::Modified,
            ..
        }
    ));
    assert_eq!(tracker.state_of(&store), Some(ChangeType::Deleted));
}

#[test]
fn test_null_kept_in_snapshot_stripped_for_create_deleted_on_modify() {
    // GIVEN a new store without a note
    let mut store = Store::new("s1", "Main");
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Added).unwrap();

    // THEN the snapshot keeps the null but CREATE data omits it
    let entry = tracker.tracked().next().unwrap();
    assert_eq!(
        entry.original_snapshot().as_mapping().unwrap()["note"],
        Snapshot::Null
    );
    let batches = tracker.pending_batches().unwrap();
    assert!(!batches[0].commands[0].data().contains_key("note"));

    // GIVEN a second unit of work where the store has a note
    tracker.save_changes(&mut ()).unwrap();
    store.note = Some("x".to_string());
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();

    // WHEN the note is cleared
    store.note = None;
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    let batches = tracker.pending_batches().unwrap();

    // THEN the UPDATE deletes the field instead of setting it
    let update = &batches[0].commands[0];
    assert!(update.deleted_fields().unwrap().contains("note"));
    assert!(!update.data().contains_key("note"));
}

#[test]
fn test_added_snapshot_is_taken_at_save_time() {
    // GIVEN a store registered as ADDED
    let mut store = Store::new("s1", "Draft");
    let mut tracker = tracker();
    tracker.set_entity(&store, ChangeType::Added).unwrap();

    // WHEN it is edited and refreshed before saving
    store.name = "Final".to_string();
    tracker.refresh_entity(&store).unwrap();
    tracker.save_changes(&mut ()).unwrap();

    // THEN the CREATE carries the latest value
    assert_eq!(
        tracker.dialect().batches()[0][0].data()["name"],
        Snapshot::from("Final")
    );
}

#[test]
fn test_refresh_requires_tracking() {
    let mut tracker = tracker();
    let err = tracker.refresh_entity(&sample_store()).unwrap_err();
    assert!(matches!(err, DocTrackError::NotTracked { .. }));
}

#[test]
fn test_unchanged_entities_are_skipped() {
    let mut tracker = tracker();
    tracker
        .set_entity(&sample_store(), ChangeType::Unchanged)
        .unwrap();

    let summary = tracker.save_changes(&mut ()).unwrap();

    assert_eq!(summary.commands, 0);
    assert!(tracker.dialect().batches().is_empty());
    assert!(tracker.is_empty());
}

#[test]
fn test_batches_follow_registration_order() {
    // GIVEN two stores registered in order s2, s1
    let mut tracker = tracker();
    tracker
        .set_entity(&Store::new("s2", "Second"), ChangeType::Added)
        .unwrap();
    tracker
        .set_entity(&Store::new("s1", "First"), ChangeType::Added)
        .unwrap();

    // WHEN saved
    let summary = tracker.save_changes(&mut ()).unwrap();

    // THEN one batch per entity in registration order
    assert_eq!(summary.entities, 2);
    let batches = tracker.dialect().batches();
    assert_eq!(batches[0][0].path().as_str(), "stores/s2");
    assert_eq!(batches[1][0].path().as_str(), "stores/s1");
}

#[test]
fn test_dialect_error_propagates_and_keeps_tracked_state() {
    // GIVEN a tracked store and a dialect armed to fail
    let mut tracker = tracker();
    tracker
        .set_entity(&sample_store(), ChangeType::Added)
        .unwrap();
    tracker.dialect_mut().fail_next(
        ExError::new(ExErrorKind::Persistence).with_message("backend unavailable"),
    );

    // WHEN changes are saved
    let err = tracker.save_changes(&mut ()).unwrap_err();

    // THEN the backend error keeps its kind, gains the unit of work's
    // correlation, and nothing was cleared
    match err {
        DocTrackError::Backend(ex) => {
            assert_eq!(ex.kind(), ExErrorKind::Persistence);
            assert_eq!(ex.message(), "backend unavailable");
            assert_eq!(
                ex.unit_of_work_id(),
                Some(&tracker.context().unit_of_work_id)
            );
            assert_eq!(ex.entity_id(), Some("Store:s1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(tracker.len(), 1);

    // AND a retry succeeds
    tracker.save_changes(&mut ()).unwrap();
    assert_eq!(tracker.dialect().batches().len(), 1);
}

/// Dialect that counts calls, to prove compile errors stop before execution
#[derive(Default)]
struct CountingDialect {
    calls: usize,
}

impl Dialect for CountingDialect {
    type Session<'s> = ();

    fn execute_commands<'s>(
        &mut self,
        _session: &mut (),
        _commands: &[AbstractCommand],
    ) -> doctrack_core::Result<()> {
        self.calls += 1;
        Ok(())
    }
}

#[test]
fn test_strict_mode_fails_before_any_execution() {
    // GIVEN strict compilation and two entities, the second of which is a
    // non-root type whose snapshot has no identity marker
    let options = TrackerOptions {
        compile_mode: CompileMode::Strict,
        ..TrackerOptions::default()
    };
    let mut tracker = ChangeTracker::with_options(registry(), CountingDialect::default(), options);
    tracker
        .set_entity(&Store::new("s1", "Main"), ChangeType::Added)
        .unwrap();
    tracker
        .set_entity(
            &Variant {
                id: "v9".to_string(),
                color: "red".to_string(),
            },
            ChangeType::Added,
        )
        .unwrap();

    // WHEN saved
    let err = tracker.save_changes(&mut ()).unwrap_err();

    // THEN compilation fails and the dialect never ran
    assert!(matches!(err, DocTrackError::MissingIdentity { .. }));
    assert_eq!(tracker.dialect().calls, 0);
    assert_eq!(tracker.len(), 2);
}

#[test]
fn test_lenient_mode_skips_identity_less_entities() {
    let mut tracker = ChangeTracker::new(registry(), CountingDialect::default());
    tracker
        .set_entity(
            &Variant {
                id: "v9".to_string(),
                color: "red".to_string(),
            },
            ChangeType::Added,
        )
        .unwrap();

    let summary = tracker.save_changes(&mut ()).unwrap();

    assert_eq!(summary.commands, 0);
    assert_eq!(tracker.dialect().calls, 0);
}

#[test]
fn test_unresolved_reference_template_aborts_registration() {
    use doctrack_core::{EntitySchema, MetadataRegistry, Record};
    use std::sync::Arc;

    // GIVEN a reference whose template needs the owner's tenant id
    let registry = Arc::new(
        MetadataRegistry::builder()
            .schema(
                EntitySchema::new("Order")
                    .id("id")
                    .field("tenant_id")
                    .reference_at("customer", "Customer", "tenants/{tenant_id}/customers")
                    .aggregate_root(),
            )
            .build()
            .unwrap(),
    );
    let mut tracker = ChangeTracker::new(registry, RecordingDialect::new());

    // WHEN an order without tenant id is registered
    let order = Record::new("Order").with("id", "o1").with("customer", "c1");
    let err = tracker.set_record(order, ChangeType::Added).unwrap_err();

    // THEN the placeholder is reported
    assert!(matches!(
        err,
        DocTrackError::UnresolvedPath { ref placeholder, .. } if placeholder == "tenant_id"
    ));
    assert!(tracker.is_empty());
}
