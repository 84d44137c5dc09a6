//! Diff output types

use std::collections::{BTreeMap, BTreeSet};

use crate::field_path;
use crate::snapshot::{EntityPath, Snapshot};

/// Marker separating a list path from the identity of one of its items
pub const LIST_SCOPE: &str = "[id=";

/// Whether a diff path points inside a list item
pub fn is_list_scoped(path: &str) -> bool {
    field_path::contains_unquoted(path, LIST_SCOPE)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: Snapshot,
    pub new: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Items are mappings carrying identity markers, matched by identity
    Identified,
    /// Items are scalars or markers, compared as a multiset
    Scalar,
}

/// Item present on both sides of an identifiable list whose content changed
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedItem {
    pub identity: EntityPath,
    /// Registered type of the item, if tagged
    pub type_name: Option<String>,
    /// Changes relative to the item itself (`qty`, not `products[id=..].qty`)
    pub changes: DiffResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListChange {
    pub kind: ListKind,
    pub added: Vec<Snapshot>,
    pub removed: Vec<Snapshot>,
    pub modified: Vec<ModifiedItem>,
    /// Scalar list rewritten whole: a pure reorder, or a list with repeated
    /// elements on either side, which union/remove cannot express
    pub replacement: Option<Vec<Snapshot>>,
}

impl ListChange {
    pub(crate) fn new(kind: ListKind) -> Self {
        Self {
            kind,
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
            replacement: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.replacement.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub fields_changed: BTreeMap<String, FieldChange>,
    pub fields_deleted: BTreeSet<String>,
    pub lists_changed: BTreeMap<String, ListChange>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.fields_changed.is_empty()
            && self.fields_deleted.is_empty()
            && self.lists_changed.is_empty()
    }

    /// Total number of reported paths
    pub fn len(&self) -> usize {
        self.fields_changed.len() + self.fields_deleted.len() + self.lists_changed.len()
    }

    /// Copy every entry of `inner` under `prefix` (`prefix.key`)
    pub(crate) fn absorb(&mut self, prefix: &str, inner: &DiffResult) {
        let scoped = |key: &str| format!("{}.{}", prefix, key);
        for (key, change) in &inner.fields_changed {
            self.fields_changed.insert(scoped(key), change.clone());
        }
        for key in &inner.fields_deleted {
            self.fields_deleted.insert(scoped(key));
        }
        for (key, change) in &inner.lists_changed {
            self.lists_changed.insert(scoped(key), change.clone());
        }
    }
}
