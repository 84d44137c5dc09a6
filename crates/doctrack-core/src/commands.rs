//! Backend-neutral persistence commands

use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::{DocPath, EntityPath, Mapping, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element-level change to an array field
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOperation {
    /// Replace the whole array
    Set(Vec<Snapshot>),
    /// Append elements not already present
    Union(Vec<Snapshot>),
    /// Remove every occurrence of the elements
    Remove(Vec<Snapshot>),
    /// Remove, then append
    UnionRemove {
        union: Vec<Snapshot>,
        remove: Vec<Snapshot>,
    },
}

impl ArrayOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            ArrayOperation::Set(_) => "SET",
            ArrayOperation::Union(_) => "UNION",
            ArrayOperation::Remove(_) => "REMOVE",
            ArrayOperation::UnionRemove { .. } => "UNION_REMOVE",
        }
    }
}

/// One persistence instruction against one document
///
/// CREATE and DELETE never carry deleted fields or array operations; UPDATE
/// carries them only when non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractCommand {
    operation: Operation,
    entity_path: EntityPath,
    data: Mapping,
    deleted_fields: Option<BTreeSet<String>>,
    array_operations: Option<BTreeMap<String, ArrayOperation>>,
    level: u32,
}

impl AbstractCommand {
    pub fn create(entity_path: EntityPath, data: Mapping, level: u32) -> Self {
        Self {
            operation: Operation::Create,
            entity_path,
            data,
            deleted_fields: None,
            array_operations: None,
            level,
        }
    }

    pub fn update(
        entity_path: EntityPath,
        data: Mapping,
        deleted_fields: BTreeSet<String>,
        array_operations: BTreeMap<String, ArrayOperation>,
        level: u32,
    ) -> Self {
        Self {
            operation: Operation::Update,
            entity_path,
            data,
            deleted_fields: (!deleted_fields.is_empty()).then_some(deleted_fields),
            array_operations: (!array_operations.is_empty()).then_some(array_operations),
            level,
        }
    }

    pub fn delete(entity_path: EntityPath, level: u32) -> Self {
        Self {
            operation: Operation::Delete,
            entity_path,
            data: Mapping::new(),
            deleted_fields: None,
            array_operations: None,
            level,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn entity_path(&self) -> &EntityPath {
        &self.entity_path
    }

    /// Target document path
    pub fn path(&self) -> &DocPath {
        self.entity_path.path()
    }

    pub fn data(&self) -> &Mapping {
        &self.data
    }

    pub fn deleted_fields(&self) -> Option<&BTreeSet<String>> {
        self.deleted_fields.as_ref()
    }

    pub fn array_operations(&self) -> Option<&BTreeMap<String, ArrayOperation>> {
        self.array_operations.as_ref()
    }

    /// Depth in the document tree, root = 0
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl std::fmt::Display for AbstractCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (level {})", self.operation, self.path(), self.level)
    }
}
