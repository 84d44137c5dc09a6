//! Plain-data snapshots of entity graphs
//!
//! A snapshot is a tree of mappings, sequences and scalars where every
//! document-bearing node carries an identity marker: a [`Snapshot::DocumentId`]
//! for an aggregate root or a [`Snapshot::CollectionReference`] for an owned
//! child. References to other documents appear as
//! [`Snapshot::DocumentReference`] and are never followed.

pub mod json;
pub mod path;
pub mod serializer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use json::{from_json, to_json};
pub use path::DocPath;
pub use serializer::SnapshotSerializer;

/// Reserved key holding the registered type name of an entity mapping
///
/// The differ ignores it and the compiler strips it from command payloads.
pub const TYPE_TAG: &str = "__type__";

pub type Mapping = BTreeMap<String, Snapshot>;

/// Geographic point stored as a native value
///
/// Coordinates compare with [`f64::total_cmp`], like [`Snapshot::Float`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.latitude, other.latitude) && same_float(self.longitude, other.longitude)
    }
}

fn same_float(a: f64, b: f64) -> bool {
    a.total_cmp(&b).is_eq()
}

/// Coarse value category used when comparing snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Null,
    Bool,
    Number,
    Text,
    DocumentId,
    DocumentReference,
    CollectionReference,
    GeoPoint,
    Mapping,
    Sequence,
}

/// Snapshot value
///
/// Equality is structural; floats compare with [`f64::total_cmp`] so a NaN
/// equals itself and a snapshot never differs from its own copy.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DocumentId(DocPath),
    DocumentReference(DocPath),
    CollectionReference(DocPath),
    GeoPoint(GeoPoint),
    Mapping(Mapping),
    Sequence(Vec<Snapshot>),
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Snapshot::Null, Snapshot::Null) => true,
            (Snapshot::Bool(a), Snapshot::Bool(b)) => a == b,
            (Snapshot::Int(a), Snapshot::Int(b)) => a == b,
            (Snapshot::Float(a), Snapshot::Float(b)) => same_float(*a, *b),
            (Snapshot::Text(a), Snapshot::Text(b)) => a == b,
            (Snapshot::DocumentId(a), Snapshot::DocumentId(b))
            | (Snapshot::DocumentReference(a), Snapshot::DocumentReference(b))
            | (Snapshot::CollectionReference(a), Snapshot::CollectionReference(b)) => a == b,
            (Snapshot::GeoPoint(a), Snapshot::GeoPoint(b)) => a == b,
            (Snapshot::Mapping(a), Snapshot::Mapping(b)) => a == b,
            (Snapshot::Sequence(a), Snapshot::Sequence(b)) => a == b,
            _ => false,
        }
    }
}

impl Snapshot {
    pub fn is_null(&self) -> bool {
        matches!(self, Snapshot::Null)
    }

    pub fn kind(&self) -> SnapshotKind {
        match self {
            Snapshot::Null => SnapshotKind::Null,
            Snapshot::Bool(_) => SnapshotKind::Bool,
            Snapshot::Int(_) | Snapshot::Float(_) => SnapshotKind::Number,
            Snapshot::Text(_) => SnapshotKind::Text,
            Snapshot::DocumentId(_) => SnapshotKind::DocumentId,
            Snapshot::DocumentReference(_) => SnapshotKind::DocumentReference,
            Snapshot::CollectionReference(_) => SnapshotKind::CollectionReference,
            Snapshot::GeoPoint(_) => SnapshotKind::GeoPoint,
            Snapshot::Mapping(_) => SnapshotKind::Mapping,
            Snapshot::Sequence(_) => SnapshotKind::Sequence,
        }
    }

    /// Mappings and sequences
    pub fn is_container(&self) -> bool {
        matches!(self, Snapshot::Mapping(_) | Snapshot::Sequence(_))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Snapshot::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Snapshot::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Registered type name of an entity mapping
    pub fn type_tag(&self) -> Option<&str> {
        self.as_mapping()
            .and_then(|m| m.get(TYPE_TAG))
            .and_then(Snapshot::as_text)
    }

    /// First field of a mapping whose value is an identity marker
    pub fn identity(&self) -> Option<(&str, EntityPath)> {
        self.as_mapping()?.iter().find_map(|(name, value)| {
            EntityPath::from_marker(value).map(|path| (name.as_str(), path))
        })
    }

    /// Copy with every null-valued mapping entry removed, recursively
    ///
    /// Nulls inside sequences are kept; only keys are dropped.
    pub fn filter_nulls(&self) -> Snapshot {
        match self {
            Snapshot::Mapping(fields) => Snapshot::Mapping(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.filter_nulls()))
                    .collect(),
            ),
            Snapshot::Sequence(items) => {
                Snapshot::Sequence(items.iter().map(Snapshot::filter_nulls).collect())
            }
            other => other.clone(),
        }
    }

    /// Copy with [`TYPE_TAG`] entries removed, recursively
    pub fn strip_type_tags(&self) -> Snapshot {
        match self {
            Snapshot::Mapping(fields) => Snapshot::Mapping(
                fields
                    .iter()
                    .filter(|(k, _)| k.as_str() != TYPE_TAG)
                    .map(|(k, v)| (k.clone(), v.strip_type_tags()))
                    .collect(),
            ),
            Snapshot::Sequence(items) => {
                Snapshot::Sequence(items.iter().map(Snapshot::strip_type_tags).collect())
            }
            other => other.clone(),
        }
    }

    /// SHA-256 hex digest of the canonical JSON form
    pub fn digest(&self) -> String {
        json::digest(self)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json::to_json(self)
    }

    /// # Errors
    ///
    /// See [`json::from_json`].
    pub fn from_json(value: &serde_json::Value) -> crate::errors::Result<Snapshot> {
        json::from_json(value)
    }
}

impl From<bool> for Snapshot {
    fn from(v: bool) -> Self {
        Snapshot::Bool(v)
    }
}

impl From<i64> for Snapshot {
    fn from(v: i64) -> Self {
        Snapshot::Int(v)
    }
}

impl From<i32> for Snapshot {
    fn from(v: i32) -> Self {
        Snapshot::Int(i64::from(v))
    }
}

impl From<f64> for Snapshot {
    fn from(v: f64) -> Self {
        Snapshot::Float(v)
    }
}

impl From<&str> for Snapshot {
    fn from(v: &str) -> Self {
        Snapshot::Text(v.to_string())
    }
}

impl From<String> for Snapshot {
    fn from(v: String) -> Self {
        Snapshot::Text(v)
    }
}

/// Identity of a document-bearing node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityPath {
    /// Aggregate root document
    DocumentId(DocPath),
    /// Document owned by a parent through a collection field
    CollectionReference(DocPath),
}

impl EntityPath {
    /// Extract an identity from a marker value
    pub fn from_marker(value: &Snapshot) -> Option<EntityPath> {
        match value {
            Snapshot::DocumentId(p) => Some(EntityPath::DocumentId(p.clone())),
            Snapshot::CollectionReference(p) => Some(EntityPath::CollectionReference(p.clone())),
            _ => None,
        }
    }

    pub fn path(&self) -> &DocPath {
        match self {
            EntityPath::DocumentId(p) | EntityPath::CollectionReference(p) => p,
        }
    }

    pub fn to_marker(&self) -> Snapshot {
        match self {
            EntityPath::DocumentId(p) => Snapshot::DocumentId(p.clone()),
            EntityPath::CollectionReference(p) => Snapshot::CollectionReference(p.clone()),
        }
    }
}

impl std::fmt::Display for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.path().fmt(f)
    }
}
