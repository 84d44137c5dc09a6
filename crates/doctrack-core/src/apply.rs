//! Functional-boundary application of commands to documents
//!
//! ## Contract
//!
//! [`apply_command`] takes the document currently stored at the command's
//! path (if any) and returns the document that should be stored afterwards
//! (`None` = no document). It never mutates its input; a backend that gets
//! `Err` keeps its previous state.
//!
//! | operation | absent document | present document |
//! |-----------|-----------------|------------------|
//! | CREATE | data becomes the document | `DocumentAlreadyExists` |
//! | UPDATE | `DocumentNotFound` | dotted-path merge, field deletions, array ops |
//! | DELETE | no-op | removed |
//!
//! UPDATE keys are field paths in the [`field_path`] syntax.
//!
//! Stored documents hold the command data without the identity field; the
//! document's own path is its identity.

use crate::commands::{AbstractCommand, ArrayOperation, Operation};
use crate::errors::{DocTrackError, Result};
use crate::field_path;
use crate::snapshot::{Mapping, Snapshot};

/// Field content of one stored document
pub type Document = Mapping;

/// Compute the document that results from applying `command`
///
/// # Errors
///
/// `DocumentAlreadyExists` for a CREATE over an existing document and
/// `DocumentNotFound` for an UPDATE of a missing one.
pub fn apply_command(existing: Option<&Document>, command: &AbstractCommand) -> Result<Option<Document>> {
    let path = command.path().to_string();
    match command.operation() {
        Operation::Create => match existing {
            Some(_) => Err(DocTrackError::DocumentAlreadyExists { path }),
            None => Ok(Some(command.data().clone())),
        },
        Operation::Update => {
            let mut doc = existing
                .cloned()
                .ok_or(DocTrackError::DocumentNotFound { path })?;
            for (field, value) in command.data() {
                set_path(&mut doc, field, value.clone());
            }
            for field in command.deleted_fields().into_iter().flatten() {
                remove_path(&mut doc, field);
            }
            for (field, op) in command.array_operations().into_iter().flatten() {
                let current = match get_path(&doc, field) {
                    Some(Snapshot::Sequence(items)) => items.clone(),
                    _ => Vec::new(),
                };
                set_path(&mut doc, field, Snapshot::Sequence(apply_array(current, op)));
            }
            Ok(Some(doc))
        }
        Operation::Delete => Ok(None),
    }
}

/// Array semantics shared by every backend
pub fn apply_array(mut items: Vec<Snapshot>, op: &ArrayOperation) -> Vec<Snapshot> {
    match op {
        ArrayOperation::Set(replacement) => replacement.clone(),
        ArrayOperation::Union(added) => {
            union(&mut items, added);
            items
        }
        ArrayOperation::Remove(removed) => {
            items.retain(|item| !removed.contains(item));
            items
        }
        ArrayOperation::UnionRemove { union: added, remove } => {
            items.retain(|item| !remove.contains(item));
            union(&mut items, added);
            items
        }
    }
}

fn union(items: &mut Vec<Snapshot>, added: &[Snapshot]) {
    for value in added {
        if !items.contains(value) {
            items.push(value.clone());
        }
    }
}

fn get_path<'d>(doc: &'d Document, path: &str) -> Option<&'d Snapshot> {
    let segments = field_path::split(path);
    let (first, rest) = segments.split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, replacing non-mapping intermediates
fn set_path(doc: &mut Document, path: &str, value: Snapshot) {
    set_segments(doc, &field_path::split(path), value);
}

fn set_segments(doc: &mut Document, segments: &[String], value: Snapshot) {
    match segments {
        [] => {}
        [last] => {
            doc.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = doc
                .entry(head.clone())
                .or_insert_with(|| Snapshot::Mapping(Mapping::new()));
            if !matches!(slot, Snapshot::Mapping(_)) {
                *slot = Snapshot::Mapping(Mapping::new());
            }
            if let Snapshot::Mapping(inner) = slot {
                set_segments(inner, rest, value);
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    let segments = field_path::split(path);
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = doc;
    for segment in parents {
        match current.get_mut(segment) {
            Some(Snapshot::Mapping(inner)) => current = inner,
            _ => return,
        }
    }
    current.remove(last);
}
