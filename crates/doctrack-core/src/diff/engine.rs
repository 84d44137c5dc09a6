//! Diff computation
//!
//! The entry point is [`diff`]. It never fails: every pair of snapshots has
//! a well-defined structural difference.

use std::collections::{BTreeSet, HashMap};

use super::model::{DiffResult, FieldChange, ListChange, ListKind, ModifiedItem, LIST_SCOPE};
use crate::field_path;
use crate::snapshot::{EntityPath, Mapping, Snapshot, TYPE_TAG};

/// Compute the structural difference between `original` and `current`
pub fn diff(original: &Snapshot, current: &Snapshot) -> DiffResult {
    let mut out = DiffResult::default();
    compare(original, current, "", &mut out);
    out
}

fn changed(out: &mut DiffResult, path: &str, old: &Snapshot, new: &Snapshot) {
    out.fields_changed.insert(
        path.to_string(),
        FieldChange {
            old: old.clone(),
            new: new.clone(),
        },
    );
}

fn compare(original: &Snapshot, current: &Snapshot, path: &str, out: &mut DiffResult) {
    match (original, current) {
        (Snapshot::Null, Snapshot::Null) => {}
        // An owned collection appearing or disappearing is diffed as a list so
        // its items still produce create/delete chains.
        (Snapshot::Null, Snapshot::Sequence(items)) if is_identified(items, &[]) => {
            compare_sequences(&[], items, path, out);
        }
        (Snapshot::Sequence(items), Snapshot::Null) if is_identified(items, &[]) => {
            compare_sequences(items, &[], path, out);
        }
        (Snapshot::Null, _) => changed(out, path, original, current),
        (_, Snapshot::Null) => {
            out.fields_deleted.insert(path.to_string());
        }
        (Snapshot::Mapping(a), Snapshot::Mapping(b)) => compare_mappings(a, b, path, out),
        (Snapshot::Sequence(a), Snapshot::Sequence(b)) => compare_sequences(a, b, path, out),
        (a, b) => {
            if a != b {
                changed(out, path, a, b);
            }
        }
    }
}

fn compare_mappings(original: &Mapping, current: &Mapping, path: &str, out: &mut DiffResult) {
    let keys: BTreeSet<&String> = original
        .keys()
        .chain(current.keys())
        .filter(|k| k.as_str() != TYPE_TAG)
        .collect();

    for key in keys {
        let child = field_path::join(path, key);
        match (original.get(key), current.get(key)) {
            (Some(a), Some(b)) => compare(a, b, &child, out),
            (Some(_), None) => {
                out.fields_deleted.insert(child);
            }
            (None, Some(b)) => {
                if !b.is_null() {
                    compare(&Snapshot::Null, b, &child, out);
                }
            }
            (None, None) => {}
        }
    }
}

/// A list is identifiable when its first element (original side first) is a
/// mapping carrying an identity marker
fn is_identified(original: &[Snapshot], current: &[Snapshot]) -> bool {
    original
        .first()
        .or_else(|| current.first())
        .and_then(Snapshot::identity)
        .is_some()
}

fn compare_sequences(original: &[Snapshot], current: &[Snapshot], path: &str, out: &mut DiffResult) {
    if original.is_empty() && current.is_empty() {
        return;
    }

    if is_identified(original, current) {
        let change = compare_identified(original, current, path, out);
        if !change.is_empty() {
            out.lists_changed.insert(path.to_string(), change);
        }
        return;
    }

    let scalar = original
        .iter()
        .chain(current.iter())
        .all(|item| !item.is_container());
    if !scalar {
        if original != current {
            changed(
                out,
                path,
                &Snapshot::Sequence(original.to_vec()),
                &Snapshot::Sequence(current.to_vec()),
            );
        }
        return;
    }

    if original == current {
        return;
    }
    let mut change = ListChange::new(ListKind::Scalar);
    if has_repeats(original) || has_repeats(current) {
        change.replacement = Some(current.to_vec());
    } else {
        change.added = current
            .iter()
            .filter(|item| !original.contains(item))
            .cloned()
            .collect();
        change.removed = original
            .iter()
            .filter(|item| !current.contains(item))
            .cloned()
            .collect();
        if change.added.is_empty() && change.removed.is_empty() {
            change.replacement = Some(current.to_vec());
        }
    }
    out.lists_changed.insert(path.to_string(), change);
}

fn has_repeats(items: &[Snapshot]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}

fn compare_identified(
    original: &[Snapshot],
    current: &[Snapshot],
    path: &str,
    out: &mut DiffResult,
) -> ListChange {
    let mut change = ListChange::new(ListKind::Identified);

    let index = |items: &[Snapshot]| -> HashMap<EntityPath, usize> {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.identity().map(|(_, id)| (id, i)))
            .collect()
    };
    let original_index = index(original);
    let current_index = index(current);

    for item in current {
        if let Some((_, identity)) = item.identity() {
            if !original_index.contains_key(&identity) {
                change.added.push(item.clone());
            }
        }
    }

    for item in original {
        let Some((_, identity)) = item.identity() else {
            continue;
        };
        match current_index.get(&identity) {
            None => change.removed.push(item.clone()),
            Some(&i) => {
                let item_changes = diff(item, &current[i]);
                if !item_changes.is_empty() {
                    let scope = format!("{}{}{}]", path, LIST_SCOPE, identity.path());
                    out.absorb(&scope, &item_changes);
                    change.modified.push(ModifiedItem {
                        identity,
                        type_name: current[i].type_tag().map(str::to_string),
                        changes: item_changes,
                    });
                }
            }
        }
    }

    change
}
