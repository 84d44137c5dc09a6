//! Declarative field tables
//!
//! ```
//! use doctrack_core::metadata::EntitySchema;
//!
//! let schema = EntitySchema::new("Store")
//!     .id("id")
//!     .field("name")
//!     .geopoint("location")
//!     .collection("products", "Product")
//!     .reference_at("owner", "User", "tenants/{tenant_id}/users/{id}")
//!     .field("tenant_id");
//! assert_eq!(schema.type_name(), "Store");
//! ```

/// How a field participates in serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Identity of the entity
    Id,
    /// Pointer to a document owned elsewhere
    Reference,
    /// Owned child documents stored under this document
    Collection,
    /// Geographic point
    GeoPoint,
    /// Anything else, serialized structurally
    Plain,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Id => "id",
            FieldKind::Reference => "reference",
            FieldKind::Collection => "collection",
            FieldKind::GeoPoint => "geopoint",
            FieldKind::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldDecl {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) target: Option<String>,
    pub(crate) path: Option<String>,
}

/// Unvalidated field declarations for one entity type
///
/// Validation happens once, when the schema is registered with a
/// [`MetadataRegistry`](super::MetadataRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub(crate) type_name: String,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) aggregate_root: bool,
}

impl EntitySchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            aggregate_root: false,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn push(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        target: Option<String>,
        path: Option<String>,
    ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            kind,
            target,
            path,
        });
        self
    }

    pub fn id(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::Id, None, None)
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::Plain, None, None)
    }

    pub fn geopoint(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::GeoPoint, None, None)
    }

    /// Reference stored at `<plural(target)>/<id>`
    pub fn reference(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.push(name, FieldKind::Reference, Some(target.into()), None)
    }

    /// Reference stored under a fixed collection name or a path template
    ///
    /// Placeholders other than `{id}` resolve against the owning entity.
    /// `/{id}` is appended when the template does not mention it.
    pub fn reference_at(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.push(
            name,
            FieldKind::Reference,
            Some(target.into()),
            Some(path.into()),
        )
    }

    /// Owned children stored at `<parent path>/<field name>/<child id>`
    pub fn collection(self, name: impl Into<String>, element: impl Into<String>) -> Self {
        self.push(name, FieldKind::Collection, Some(element.into()), None)
    }

    /// Owned children stored under a custom relative path
    ///
    /// Placeholders resolve against each child. A template without any
    /// placeholder gets `/{id}` appended.
    pub fn collection_at(
        self,
        name: impl Into<String>,
        element: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.push(
            name,
            FieldKind::Collection,
            Some(element.into()),
            Some(path.into()),
        )
    }

    /// Persist as a root document even without collection fields
    pub fn aggregate_root(mut self) -> Self {
        self.aggregate_root = true;
        self
    }
}
