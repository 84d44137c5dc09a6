//! Snapshot/diff → command compilation
//!
//! Every identity-bearing node of a snapshot becomes one command. Collection
//! fields are never written into their owner's data; their items become
//! commands of their own one level deeper.

use std::collections::{BTreeMap, BTreeSet};

use crate::commands::{AbstractCommand, ArrayOperation, Operation};
use crate::diff::model::is_list_scoped;
use crate::diff::{DiffResult, ListChange, ListKind};
use crate::errors::{DocTrackError, Result};
use crate::field_path;
use crate::metadata::{FieldKind, MetadataRegistry};
use crate::snapshot::{EntityPath, Mapping, Snapshot, TYPE_TAG};

/// How the compiler treats nodes that carry no identity marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileMode {
    /// Skip the node (and its subtree) with a debug log line
    #[default]
    Lenient,
    /// Fail with `MissingIdentity`
    Strict,
}

pub struct CommandCompiler<'r> {
    registry: &'r MetadataRegistry,
    mode: CompileMode,
}

impl<'r> CommandCompiler<'r> {
    pub fn new(registry: &'r MetadataRegistry, mode: CompileMode) -> Self {
        Self { registry, mode }
    }

    /// Compile a whole snapshot tree into CREATE or DELETE commands
    ///
    /// CREATE data has nulls stripped; DELETE commands carry no data.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` for UPDATE (see [`compile_update`](Self::compile_update)),
    /// `MissingIdentity` in strict mode.
    pub fn compile(
        &self,
        snapshot: &Snapshot,
        level: u32,
        operation: Operation,
    ) -> Result<Vec<AbstractCommand>> {
        let mut out = Vec::new();
        match operation {
            Operation::Create => self.walk(&snapshot.filter_nulls(), level, operation, None, &mut out)?,
            Operation::Delete => self.walk(snapshot, level, operation, None, &mut out)?,
            Operation::Update => {
                return Err(DocTrackError::UnsupportedOperation {
                    operation: "UPDATE commands are compiled from a diff".to_string(),
                })
            }
        }
        Ok(out)
    }

    /// Compile a diff of `root` into UPDATE commands plus CREATE/DELETE
    /// chains for items added to or removed from owned collections
    ///
    /// # Errors
    ///
    /// `MissingIdentity` when `root` has no identity marker (strict mode) or a
    /// nested item lacks one (strict mode).
    pub fn compile_update(&self, diff: &DiffResult, root: &Snapshot) -> Result<Vec<AbstractCommand>> {
        let mut out = Vec::new();
        match root.identity() {
            Some((_, identity)) => self.update_node(diff, root.type_tag(), &identity, 0, &mut out)?,
            None => self.missing_identity(None, 0)?,
        }
        Ok(out)
    }

    fn missing_identity(&self, parent: Option<&EntityPath>, level: u32) -> Result<()> {
        let parent = parent.map_or_else(|| "<root>".to_string(), |p| p.to_string());
        match self.mode {
            CompileMode::Lenient => {
                tracing::debug!(parent = %parent, level, "skipping node without identity marker");
                Ok(())
            }
            CompileMode::Strict => Err(DocTrackError::MissingIdentity { parent, level }),
        }
    }

    /// Whether `name` on `node` holds owned child documents
    ///
    /// Registered metadata decides; untagged mappings fall back to shape: a
    /// non-empty sequence of mappings each carrying a CollectionReference.
    fn is_collection(&self, node: &Snapshot, name: &str, value: &Snapshot) -> bool {
        if let Some(meta) = node.type_tag().and_then(|t| self.registry.get(t)) {
            if let Some(field) = meta.field(name) {
                return field.kind() == FieldKind::Collection;
            }
        }
        match value {
            Snapshot::Sequence(items) if !items.is_empty() => items.iter().all(|item| {
                matches!(item.identity(), Some((_, EntityPath::CollectionReference(_))))
            }),
            _ => false,
        }
    }

    fn walk(
        &self,
        node: &Snapshot,
        level: u32,
        operation: Operation,
        parent: Option<&EntityPath>,
        out: &mut Vec<AbstractCommand>,
    ) -> Result<()> {
        let (Some(fields), Some((id_field, identity))) = (node.as_mapping(), node.identity()) else {
            return self.missing_identity(parent, level);
        };

        let mut data = Mapping::new();
        let mut children = Vec::new();
        for (name, value) in fields {
            if name == id_field || name == TYPE_TAG {
                continue;
            }
            if self.is_collection(node, name, value) {
                if let Snapshot::Sequence(items) = value {
                    children.extend(items.iter());
                }
                continue;
            }
            if operation == Operation::Create {
                data.insert(name.clone(), value.strip_type_tags());
            }
        }

        out.push(match operation {
            Operation::Delete => AbstractCommand::delete(identity.clone(), level),
            _ => AbstractCommand::create(identity.clone(), data, level),
        });

        for child in children {
            self.walk(child, level + 1, operation, Some(&identity), out)?;
        }
        Ok(())
    }

    /// Names of the Collection fields of a registered type
    fn collection_fields(&self, type_name: Option<&str>) -> BTreeSet<&str> {
        type_name
            .and_then(|t| self.registry.get(t))
            .map(|meta| {
                meta.fields()
                    .iter()
                    .filter(|f| f.kind() == FieldKind::Collection)
                    .map(|f| f.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn update_node(
        &self,
        diff: &DiffResult,
        type_name: Option<&str>,
        identity: &EntityPath,
        level: u32,
        out: &mut Vec<AbstractCommand>,
    ) -> Result<()> {
        // Collection fields never live in the owner's document, so a list
        // appearing empty from null (or vanishing) is not a field write.
        let collections = self.collection_fields(type_name);
        let own_field = |path: &str| {
            !is_list_scoped(path)
                && field_path::split(path)
                    .first()
                    .map_or(true, |top| !collections.contains(top.as_str()))
        };
        let data: Mapping = diff
            .fields_changed
            .iter()
            .filter(|(path, _)| own_field(path))
            .map(|(path, change)| (path.clone(), change.new.strip_type_tags()))
            .collect();
        let deleted: BTreeSet<String> = diff
            .fields_deleted
            .iter()
            .filter(|path| own_field(path))
            .cloned()
            .collect();

        let mut array_operations = BTreeMap::new();
        let mut followups = Vec::new();
        for (path, change) in &diff.lists_changed {
            if is_list_scoped(path) {
                continue;
            }
            match change.kind {
                ListKind::Scalar => {
                    if let Some(op) = array_operation(change) {
                        array_operations.insert(path.clone(), op);
                    }
                }
                ListKind::Identified => {
                    for added in &change.added {
                        self.walk(
                            &added.filter_nulls(),
                            level + 1,
                            Operation::Create,
                            Some(identity),
                            &mut followups,
                        )?;
                    }
                    for removed in &change.removed {
                        self.walk(removed, level + 1, Operation::Delete, Some(identity), &mut followups)?;
                    }
                    for item in &change.modified {
                        self.update_node(
                            &item.changes,
                            item.type_name.as_deref(),
                            &item.identity,
                            level + 1,
                            &mut followups,
                        )?;
                    }
                }
            }
        }

        if !data.is_empty() || !deleted.is_empty() || !array_operations.is_empty() {
            out.push(AbstractCommand::update(
                identity.clone(),
                data,
                deleted,
                array_operations,
                level,
            ));
        }
        out.extend(followups);
        Ok(())
    }
}

/// Array operation for a scalar list change
///
/// A replacement (reorder or repeated elements) becomes SET; otherwise added
/// and removed elements map onto union, remove or both.
pub fn array_operation(change: &ListChange) -> Option<ArrayOperation> {
    if let Some(items) = &change.replacement {
        return Some(ArrayOperation::Set(items.clone()));
    }
    match (change.added.is_empty(), change.removed.is_empty()) {
        (false, false) => Some(ArrayOperation::UnionRemove {
            union: change.added.clone(),
            remove: change.removed.clone(),
        }),
        (false, true) => Some(ArrayOperation::Union(change.added.clone())),
        (true, false) => Some(ArrayOperation::Remove(change.removed.clone())),
        (true, true) => None,
    }
}
