//! End-to-end unit of work against the in-memory document store
//!
//! ## Scenarios Covered
//!
//! 1. Create, modify and delete an aggregate through successive saves
//! 2. Array mutations applied to stored documents
//! 3. Failed batches leave the store untouched
//! 4. Map keys containing dots are updated in place

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;

use common::{registry, sample_store, Product, Store};
use doctrack_core::snapshot::Mapping;
use doctrack_core::{
    ChangeTracker, ChangeType, ConsoleDialect, DocTrackError, FieldValue, MemoryDialect,
    MemoryDocumentStore, Record, Snapshot,
};

fn tracker() -> ChangeTracker<MemoryDialect> {
    ChangeTracker::new(registry(), MemoryDialect)
}

#[test]
fn test_full_lifecycle() {
    let mut db = MemoryDocumentStore::new();
    let mut tracker = tracker();

    // GIVEN the sample store saved as new
    let mut store = sample_store();
    tracker.set_entity(&store, ChangeType::Added).unwrap();
    tracker.save_changes(&mut db).unwrap();

    // THEN every node exists as its own document
    let paths: Vec<_> = db.paths().collect();
    assert_eq!(
        paths,
        vec![
            "stores/s1",
            "stores/s1/products/p1",
            "stores/s1/products/p1/variants/v1",
        ]
    );
    assert_eq!(db.get("stores/s1").unwrap()["name"], Snapshot::from("Main"));
    assert!(!db.get("stores/s1").unwrap().contains_key("products"));

    // WHEN the store is renamed, p1's qty changes and p2 is added
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();
    store.name = "Flagship".to_string();
    store.products[0].qty = 3;
    store.products.push(Product::new("p2", "Gadget", 1));
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut db).unwrap();

    // THEN the documents reflect the new state
    assert_eq!(
        db.get("stores/s1").unwrap()["name"],
        Snapshot::from("Flagship")
    );
    assert_eq!(
        db.get("stores/s1/products/p1").unwrap()["qty"],
        Snapshot::Int(3)
    );
    assert_eq!(
        db.list_collection("stores/s1/products").count(),
        2,
        "p1 and p2 should both be stored"
    );

    // WHEN the whole aggregate is deleted
    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();
    tracker.set_entity(&store, ChangeType::Deleted).unwrap();
    tracker.save_changes(&mut db).unwrap();

    // THEN nothing is left
    assert!(db.is_empty());
}

#[test]
fn test_tag_mutations_reach_the_document() {
    let mut db = MemoryDocumentStore::new();
    let mut tracker = tracker();
    let mut store = Store::new("s1", "Main");
    store.tags = vec!["a".to_string(), "b".to_string()];
    tracker.set_entity(&store, ChangeType::Added).unwrap();
    tracker.save_changes(&mut db).unwrap();

    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();
    store.tags = vec!["b".to_string(), "c".to_string()];
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut db).unwrap();

    assert_eq!(
        db.get("stores/s1").unwrap()["tags"],
        Snapshot::Sequence(vec![Snapshot::from("b"), Snapshot::from("c")])
    );
}

#[test]
fn test_cleared_field_is_removed_from_document() {
    let mut db = MemoryDocumentStore::new();
    let mut tracker = tracker();
    let mut store = Store::new("s1", "Main");
    store.note = Some("closing soon".to_string());
    tracker.set_entity(&store, ChangeType::Added).unwrap();
    tracker.save_changes(&mut db).unwrap();
    assert!(db.get("stores/s1").unwrap().contains_key("note"));

    tracker.set_entity(&store, ChangeType::Unchanged).unwrap();
    store.note = None;
    tracker.set_entity(&store, ChangeType::Modified).unwrap();
    tracker.save_changes(&mut db).unwrap();

    assert!(!db.get("stores/s1").unwrap().contains_key("note"));
}

#[test]
fn test_dotted_map_key_is_updated_in_place() {
    let store = |version: i64| {
        let mut labels = BTreeMap::new();
        labels.insert("v1.2".to_string(), FieldValue::from(version));
        Record::new("Store")
            .with("id", "s1")
            .with("name", "Main")
            .with("address", FieldValue::Map(labels))
    };

    // GIVEN a store whose map field has the key "v1.2"
    let mut db = MemoryDocumentStore::new();
    let mut tracker = tracker();
    tracker.set_record(store(1), ChangeType::Added).unwrap();
    tracker.save_changes(&mut db).unwrap();

    // WHEN the value under that key changes
    tracker.set_record(store(1), ChangeType::Unchanged).unwrap();
    tracker.set_record(store(2), ChangeType::Modified).unwrap();
    tracker.save_changes(&mut db).unwrap();

    // THEN the same key holds the new value and no nested map appears
    assert_eq!(
        db.get("stores/s1").unwrap()["address"],
        Snapshot::Mapping(Mapping::from([("v1.2".to_string(), Snapshot::Int(2))]))
    );
}

#[test]
fn test_duplicate_create_fails_and_keeps_store() {
    // GIVEN a store already saved
    let mut db = MemoryDocumentStore::new();
    let mut tracker = tracker();
    tracker
        .set_entity(&sample_store(), ChangeType::Added)
        .unwrap();
    tracker.save_changes(&mut db).unwrap();
    let before = db.clone();

    // WHEN the same aggregate is added again
    tracker
        .set_entity(&sample_store(), ChangeType::Added)
        .unwrap();
    let err = tracker.save_changes(&mut db).unwrap_err();

    // THEN the store rejects it and no partial write remains
    assert!(matches!(err, DocTrackError::DocumentAlreadyExists { .. }));
    assert_eq!(db, before);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_console_dialect_transcript_is_parent_first() {
    let mut tracker = ChangeTracker::new(registry(), ConsoleDialect::new());
    tracker
        .set_entity(&sample_store(), ChangeType::Added)
        .unwrap();
    tracker.save_changes(&mut ()).unwrap();

    let transcript = tracker.dialect().transcript();
    assert_eq!(transcript.len(), 3);
    assert!(transcript[0].starts_with("db.collection('stores').document('s1').create("));
    assert!(transcript[1].starts_with("  db.collection('stores').document('s1').collection('products').document('p1').create("));
    assert!(transcript[2].starts_with("    "));
    assert!(transcript[2].ends_with(".create({\"color\":\"red\"})"));
}
