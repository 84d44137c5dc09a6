//! Entity → snapshot conversion
//!
//! The same Id field serializes differently depending on where the entity
//! sits: a root document id, an owned child reference, or plain text when
//! the entity is merely embedded as a value.

use super::{DocPath, GeoPoint, Mapping, Snapshot, TYPE_TAG};
use crate::errors::{DocTrackError, Result};
use crate::metadata::{EntityMetadata, FieldDescriptor, FieldKind, MetadataRegistry};
use crate::model::{FieldValue, Record};

/// Where the entity being serialized sits in the graph
enum Position<'a> {
    /// Top of the walk
    Root,
    /// Owned child reached through a Collection field
    CollectionChild {
        path: &'a DocPath,
        identity_field: Option<&'a str>,
    },
    /// Embedded value inside a plain field, list or map
    Nested,
}

/// Identities currently on the walk, used to stop at cycles
#[derive(Default)]
struct Walk {
    stack: Vec<(String, String, DocPath)>,
}

impl Walk {
    fn find(&self, type_name: &str, id: &str) -> Option<&DocPath> {
        self.stack
            .iter()
            .find(|(t, i, _)| t == type_name && i == id)
            .map(|(_, _, p)| p)
    }
}

/// Serializes records into snapshots using registered metadata
///
/// Types without registered metadata are treated as value objects: every
/// field is Plain and no type tag is emitted.
pub struct SnapshotSerializer<'r> {
    registry: &'r MetadataRegistry,
}

impl<'r> SnapshotSerializer<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self { registry }
    }

    /// Serialize `record` as the root of a snapshot
    ///
    /// # Errors
    ///
    /// `MissingId` for an aggregate root without id, `UnresolvedPath` when a
    /// reference or collection path cannot be built, `InvalidGeoPoint` and
    /// `InvalidCollectionValue` for values that do not fit their field kind.
    pub fn serialize(&self, record: &Record) -> Result<Snapshot> {
        self.entity(record, Position::Root, &mut Walk::default())
    }

    fn entity(&self, record: &Record, position: Position<'_>, walk: &mut Walk) -> Result<Snapshot> {
        let meta = self.registry.get(record.type_name());
        let id = meta.and_then(|m| m.id_of(record));

        let node_path = match (&position, meta) {
            (Position::Root, Some(m)) if m.is_aggregate_root() => {
                let id = id.as_deref().ok_or_else(|| DocTrackError::MissingId {
                    entity_type: record.type_name().to_string(),
                })?;
                Some(m.root_path(id)?)
            }
            (Position::CollectionChild { path, .. }, _) => Some((*path).clone()),
            _ => None,
        };

        if let (Some(m), Some(id)) = (meta, id.as_deref()) {
            if let Some(seen) = walk.find(m.type_name(), id) {
                tracing::debug!(
                    entity_type = m.type_name(),
                    entity_id = id,
                    "cycle detected, emitting reference"
                );
                return Ok(Snapshot::DocumentReference(seen.clone()));
            }
            let anchor = match &node_path {
                Some(p) => p.clone(),
                None => m.root_path(id)?,
            };
            walk.stack
                .push((m.type_name().to_string(), id.to_string(), anchor));
        }

        let result = self.fields(record, meta, &position, node_path.as_ref(), walk);

        if meta.is_some() && id.is_some() {
            walk.stack.pop();
        }
        result
    }

    fn fields(
        &self,
        record: &Record,
        meta: Option<&EntityMetadata>,
        position: &Position<'_>,
        node_path: Option<&DocPath>,
        walk: &mut Walk,
    ) -> Result<Snapshot> {
        let mut out = Mapping::new();
        if let Some(m) = meta {
            out.insert(TYPE_TAG.to_string(), Snapshot::Text(m.type_name().to_string()));
        }

        let identity_field = match position {
            Position::CollectionChild { identity_field, .. } => *identity_field,
            _ => None,
        };

        for (name, value) in record.fields() {
            let descriptor = meta.and_then(|m| m.field(name));
            let kind = descriptor.map_or(FieldKind::Plain, FieldDescriptor::kind);

            let snapshot = if identity_field == Some(name) {
                node_path.map_or(Snapshot::Null, |p| Snapshot::CollectionReference(p.clone()))
            } else if value.is_null() {
                Snapshot::Null
            } else {
                match (kind, descriptor) {
                    (FieldKind::Id, _) => self.id(value, position, node_path),
                    (FieldKind::Reference, Some(d)) => self.reference(record, d, value)?,
                    (FieldKind::Collection, Some(d)) => {
                        self.collection(d, value, node_path, walk)?
                    }
                    (FieldKind::GeoPoint, _) => Snapshot::GeoPoint(geopoint(name, value)?),
                    _ => self.plain(value, walk)?,
                }
            };
            out.insert(name.to_string(), snapshot);
        }

        if let (Some(field), Some(path)) = (identity_field, node_path) {
            out.entry(field.to_string())
                .or_insert_with(|| Snapshot::CollectionReference(path.clone()));
        }

        Ok(Snapshot::Mapping(out))
    }

    fn id(&self, value: &FieldValue, position: &Position<'_>, node_path: Option<&DocPath>) -> Snapshot {
        match (position, node_path) {
            (Position::Root, Some(path)) => Snapshot::DocumentId(path.clone()),
            (Position::CollectionChild { .. }, Some(path)) => {
                Snapshot::CollectionReference(path.clone())
            }
            _ => match value {
                FieldValue::Int(i) => Snapshot::Int(*i),
                other => other
                    .as_identifier()
                    .map_or(Snapshot::Null, Snapshot::Text),
            },
        }
    }

    fn reference(
        &self,
        owner: &Record,
        field: &FieldDescriptor,
        value: &FieldValue,
    ) -> Result<Snapshot> {
        match value {
            FieldValue::Null => Ok(Snapshot::Null),
            FieldValue::List(items) => Ok(Snapshot::Sequence(
                items
                    .iter()
                    .map(|item| self.reference(owner, field, item))
                    .collect::<Result<_>>()?,
            )),
            FieldValue::Entity(target) => {
                let target_id = self
                    .registry
                    .get(target.type_name())
                    .and_then(|m| m.id_of(target))
                    .or_else(|| target.get("id").and_then(FieldValue::as_identifier))
                    .ok_or_else(|| DocTrackError::MissingId {
                        entity_type: target.type_name().to_string(),
                    })?;
                Ok(Snapshot::DocumentReference(
                    field.resolve_reference(owner, &target_id)?,
                ))
            }
            other => match other.as_identifier() {
                Some(target_id) => Ok(Snapshot::DocumentReference(
                    field.resolve_reference(owner, &target_id)?,
                )),
                None => Err(DocTrackError::MissingId {
                    entity_type: field.target().unwrap_or_default().to_string(),
                }),
            },
        }
    }

    fn collection(
        &self,
        field: &FieldDescriptor,
        value: &FieldValue,
        base: Option<&DocPath>,
        walk: &mut Walk,
    ) -> Result<Snapshot> {
        let FieldValue::List(items) = value else {
            return Err(DocTrackError::InvalidCollectionValue {
                field: field.name().to_string(),
            });
        };

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let FieldValue::Entity(child) = item else {
                return Err(DocTrackError::InvalidCollectionValue {
                    field: field.name().to_string(),
                });
            };
            let Some(base) = base else {
                // Embedded owner with no document path of its own
                out.push(self.entity(child, Position::Nested, walk)?);
                continue;
            };
            let child_meta = self.registry.get(child.type_name());
            let child_id_field = child_meta.and_then(|m| m.id_field()).map(|f| f.name());
            let path = field.resolve_child(base, child, child_id_field)?;
            let identity_field = child_id_field.or_else(|| {
                field
                    .path_template()
                    .and_then(|t| t.placeholders().find(|p| *p != "id"))
            });
            out.push(self.entity(
                child,
                Position::CollectionChild {
                    path: &path,
                    identity_field,
                },
                walk,
            )?);
        }
        Ok(Snapshot::Sequence(out))
    }

    fn plain(&self, value: &FieldValue, walk: &mut Walk) -> Result<Snapshot> {
        Ok(match value {
            FieldValue::Null => Snapshot::Null,
            FieldValue::Bool(b) => Snapshot::Bool(*b),
            FieldValue::Int(i) => Snapshot::Int(*i),
            FieldValue::Float(f) => Snapshot::Float(*f),
            FieldValue::Text(s) => Snapshot::Text(s.clone()),
            FieldValue::GeoPoint(g) => Snapshot::GeoPoint(*g),
            FieldValue::List(items) => Snapshot::Sequence(
                items
                    .iter()
                    .map(|item| self.plain(item, walk))
                    .collect::<Result<_>>()?,
            ),
            FieldValue::Map(entries) => Snapshot::Mapping(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.plain(v, walk)?)))
                    .collect::<Result<_>>()?,
            ),
            FieldValue::Entity(nested) => self.entity(nested, Position::Nested, walk)?,
        })
    }
}

fn geopoint(field: &str, value: &FieldValue) -> Result<GeoPoint> {
    let invalid = || DocTrackError::InvalidGeoPoint {
        field: field.to_string(),
    };
    match value {
        FieldValue::GeoPoint(g) => Ok(*g),
        FieldValue::List(pair) if pair.len() == 2 => {
            let lat = pair[0].as_number().ok_or_else(invalid)?;
            let lon = pair[1].as_number().ok_or_else(invalid)?;
            Ok(GeoPoint::new(lat, lon))
        }
        FieldValue::Map(entries) => {
            let coordinate = |name: &str| entries.get(name).and_then(FieldValue::as_number);
            match (coordinate("latitude"), coordinate("longitude")) {
                (Some(lat), Some(lon)) => Ok(GeoPoint::new(lat, lon)),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntitySchema;

    fn registry() -> MetadataRegistry {
        MetadataRegistry::builder()
            .schema(
                EntitySchema::new("Store")
                    .id("id")
                    .field("name")
                    .geopoint("location")
                    .reference("category", "Category")
                    .collection("products", "Product"),
            )
            .schema(
                EntitySchema::new("Product")
                    .id("id")
                    .field("qty")
                    .collection("variants", "Variant"),
            )
            .schema(EntitySchema::new("Variant").id("id").field("color"))
            .build()
            .unwrap()
    }

    fn path(p: &str) -> DocPath {
        DocPath::parse(p).unwrap()
    }

    #[test]
    fn test_root_and_children_get_markers() {
        let registry = registry();
        let store = Record::new("Store")
            .with("id", "s1")
            .with("name", "Main")
            .with(
                "products",
                vec![Record::new("Product")
                    .with("id", "p1")
                    .with("qty", 2)
                    .with(
                        "variants",
                        vec![Record::new("Variant").with("id", "v1").with("color", "red")],
                    )],
            );

        let snap = SnapshotSerializer::new(&registry).serialize(&store).unwrap();
        let fields = snap.as_mapping().unwrap();
        assert_eq!(fields["id"], Snapshot::DocumentId(path("stores/s1")));
        assert_eq!(fields[TYPE_TAG], Snapshot::from("Store"));

        let Snapshot::Sequence(products) = &fields["products"] else {
            panic!("products should be a sequence");
        };
        let product = products[0].as_mapping().unwrap();
        assert_eq!(
            product["id"],
            Snapshot::CollectionReference(path("stores/s1/products/p1"))
        );
        let Snapshot::Sequence(variants) = &product["variants"] else {
            panic!("variants should be a sequence");
        };
        assert_eq!(
            variants[0].as_mapping().unwrap()["id"],
            Snapshot::CollectionReference(path("stores/s1/products/p1/variants/v1"))
        );
    }

    #[test]
    fn test_reference_accepts_record_or_bare_id() {
        let registry = registry();
        let with_record = Record::new("Store")
            .with("id", "s1")
            .with("category", Record::new("Category").with("id", "c1"));
        let with_id = Record::new("Store").with("id", "s1").with("category", "c1");

        let serializer = SnapshotSerializer::new(&registry);
        for record in [with_record, with_id] {
            let snap = serializer.serialize(&record).unwrap();
            assert_eq!(
                snap.as_mapping().unwrap()["category"],
                Snapshot::DocumentReference(path("categories/c1"))
            );
        }
    }

    #[test]
    fn test_non_root_entity_id_is_plain_text() {
        let registry = registry();
        let variant = Record::new("Variant").with("id", "v1");
        let snap = SnapshotSerializer::new(&registry).serialize(&variant).unwrap();
        assert_eq!(snap.as_mapping().unwrap()["id"], Snapshot::from("v1"));
    }

    #[test]
    fn test_geopoint_shapes() {
        let registry = registry();
        let serializer = SnapshotSerializer::new(&registry);
        let pair = Record::new("Store")
            .with("id", "s1")
            .with("location", vec![FieldValue::Float(1.0), FieldValue::Int(2)]);
        let snap = serializer.serialize(&pair).unwrap();
        assert_eq!(
            snap.as_mapping().unwrap()["location"],
            Snapshot::GeoPoint(GeoPoint::new(1.0, 2.0))
        );

        let bad = Record::new("Store").with("id", "s1").with("location", "north");
        assert!(matches!(
            serializer.serialize(&bad),
            Err(DocTrackError::InvalidGeoPoint { .. })
        ));
    }

    #[test]
    fn test_root_without_id_fails() {
        let registry = registry();
        let store = Record::new("Store").with("name", "nameless");
        let err = SnapshotSerializer::new(&registry).serialize(&store).unwrap_err();
        assert!(matches!(err, DocTrackError::MissingId { .. }));
    }

    #[test]
    fn test_repeated_identity_becomes_reference() {
        let registry = registry();
        let inner = Record::new("Store").with("id", "s1");
        let store = Record::new("Store")
            .with("id", "s1")
            .with("meta", FieldValue::Map([("self".to_string(), inner.into())].into()));

        let snap = SnapshotSerializer::new(&registry).serialize(&store).unwrap();
        let meta = snap.as_mapping().unwrap()["meta"].as_mapping().unwrap();
        assert_eq!(
            meta["self"],
            Snapshot::DocumentReference(path("stores/s1"))
        );
    }

    #[test]
    fn test_collection_must_hold_entities() {
        let registry = registry();
        let store = Record::new("Store").with("id", "s1").with("products", vec!["p1"]);
        let err = SnapshotSerializer::new(&registry).serialize(&store).unwrap_err();
        assert!(matches!(err, DocTrackError::InvalidCollectionValue { .. }));
    }
}
