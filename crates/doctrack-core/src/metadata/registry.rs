use std::collections::{HashMap, HashSet};

use super::inflect::plural;
use super::schema::{EntitySchema, FieldDecl, FieldKind};
use super::template::{PathTemplate, ID_PLACEHOLDER};
use crate::errors::{DocTrackError, Result};
use crate::model::{Entity, FieldValue, Record};
use crate::snapshot::path::check_segment;
use crate::snapshot::DocPath;

/// Validated description of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    target: Option<String>,
    template: Option<PathTemplate>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Referenced type (Reference) or element type (Collection)
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Effective path template for Reference and Collection fields
    pub fn path_template(&self) -> Option<&PathTemplate> {
        self.template.as_ref()
    }

    /// Absolute path of a referenced document
    ///
    /// # Errors
    ///
    /// `UnresolvedPath` when a placeholder has no value on `owner`, `InvalidPath`
    /// when a value is not a single segment or the result is not a document.
    pub fn resolve_reference(&self, owner: &Record, target_id: &str) -> Result<DocPath> {
        let template = self.template_or_err()?;
        let mut values = Vec::new();
        let rendered = template
            .render(|name| {
                let value = if name == ID_PLACEHOLDER {
                    Some(target_id.to_string())
                } else {
                    owner.get(name).and_then(FieldValue::as_identifier)
                };
                values.extend(value.clone());
                value
            })
            .map_err(|placeholder| self.unresolved(template, placeholder))?;
        values.iter().try_for_each(|v| check_segment(v))?;
        DocPath::document(&rendered)
    }

    /// Path of an owned child document under `base`
    ///
    /// `{id}` resolves to the child's Id field; other placeholders name child fields.
    ///
    /// # Errors
    ///
    /// `UnresolvedPath` when a placeholder has no value on `child`, `InvalidPath`
    /// when a value is not a single segment.
    pub fn resolve_child(
        &self,
        base: &DocPath,
        child: &Record,
        child_id_field: Option<&str>,
    ) -> Result<DocPath> {
        let template = self.template_or_err()?;
        let mut values = Vec::new();
        let relative = template
            .render(|name| {
                let field = if name == ID_PLACEHOLDER {
                    child_id_field?
                } else {
                    name
                };
                let value = child.get(field).and_then(FieldValue::as_identifier);
                values.extend(value.clone());
                value
            })
            .map_err(|placeholder| self.unresolved(template, placeholder))?;
        values.iter().try_for_each(|v| check_segment(v))?;
        base.join(&relative)
    }

    fn template_or_err(&self) -> Result<&PathTemplate> {
        self.template
            .as_ref()
            .ok_or_else(|| DocTrackError::UnsupportedOperation {
                operation: format!("path resolution on {} field {}", self.kind.as_str(), self.name),
            })
    }

    fn unresolved(&self, template: &PathTemplate, placeholder: String) -> DocTrackError {
        DocTrackError::UnresolvedPath {
            field: self.name.clone(),
            template: template.to_string(),
            placeholder,
        }
    }
}

/// Validated field table of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    type_name: String,
    collection_name: String,
    fields: Vec<FieldDescriptor>,
    explicit_root: bool,
}

impl EntityMetadata {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Top-level collection used when this type is stored as a root document
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.kind == FieldKind::Id)
    }

    pub fn has_collections(&self) -> bool {
        self.fields.iter().any(|f| f.kind == FieldKind::Collection)
    }

    /// Aggregate roots own collections or opted in explicitly
    pub fn is_aggregate_root(&self) -> bool {
        self.explicit_root || self.has_collections()
    }

    /// Identifier of `record`, read through the Id field
    pub fn id_of(&self, record: &Record) -> Option<String> {
        self.id_field()
            .and_then(|f| record.get(&f.name))
            .and_then(FieldValue::as_identifier)
    }

    /// `<collection_name>/<id>`
    ///
    /// # Errors
    ///
    /// `InvalidPath` if the id cannot form a path segment.
    pub fn root_path(&self, id: &str) -> Result<DocPath> {
        DocPath::root(&self.collection_name, id)
    }
}

/// Registry of validated entity metadata
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    types: HashMap<String, EntityMetadata>,
}

impl MetadataRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&EntityMetadata> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects schemas and validates them together
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: Vec<EntitySchema>,
}

impl RegistryBuilder {
    /// Register an [`Entity`] implementation
    pub fn register<E: Entity>(self) -> Self {
        self.schema(E::schema())
    }

    pub fn schema(mut self, schema: EntitySchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Validate every schema against the full set of registered types
    ///
    /// # Errors
    ///
    /// Any configuration error: duplicate types or fields, more than one Id
    /// field, malformed templates, placeholders naming undeclared fields, or
    /// collections targeting an unregistered type.
    pub fn build(self) -> Result<MetadataRegistry> {
        let mut seen = HashSet::new();
        for schema in &self.schemas {
            if !seen.insert(schema.type_name.clone()) {
                return Err(DocTrackError::DuplicateEntityType {
                    entity_type: schema.type_name.clone(),
                });
            }
            check_fields(schema)?;
        }

        let by_name: HashMap<&str, &EntitySchema> = self
            .schemas
            .iter()
            .map(|s| (s.type_name.as_str(), s))
            .collect();

        let mut types = HashMap::new();
        for schema in &self.schemas {
            let fields = schema
                .fields
                .iter()
                .map(|decl| describe(schema, decl, &by_name))
                .collect::<Result<Vec<_>>>()?;
            types.insert(
                schema.type_name.clone(),
                EntityMetadata {
                    type_name: schema.type_name.clone(),
                    collection_name: plural(&schema.type_name),
                    fields,
                    explicit_root: schema.aggregate_root,
                },
            );
        }
        tracing::debug!(entity_types = types.len(), "metadata registry built");
        Ok(MetadataRegistry { types })
    }
}

fn check_fields(schema: &EntitySchema) -> Result<()> {
    let mut names = HashSet::new();
    for decl in &schema.fields {
        if !names.insert(decl.name.as_str()) {
            return Err(DocTrackError::DuplicateField {
                entity_type: schema.type_name.clone(),
                field: decl.name.clone(),
            });
        }
    }
    let ids = schema
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::Id)
        .count();
    if ids > 1 {
        return Err(DocTrackError::MultipleIdFields {
            entity_type: schema.type_name.clone(),
        });
    }
    Ok(())
}

fn declares(schema: &EntitySchema, field: &str) -> bool {
    schema.fields.iter().any(|f| f.name == field)
}

fn has_id(schema: &EntitySchema) -> bool {
    schema.fields.iter().any(|f| f.kind == FieldKind::Id)
}

fn describe(
    owner: &EntitySchema,
    decl: &FieldDecl,
    by_name: &HashMap<&str, &EntitySchema>,
) -> Result<FieldDescriptor> {
    let unknown = |placeholder: &str, side: &str| DocTrackError::UnknownPlaceholder {
        entity_type: owner.type_name.clone(),
        field: decl.name.clone(),
        placeholder: placeholder.to_string(),
        side: side.to_string(),
    };

    let template = match decl.kind {
        FieldKind::Reference => {
            let target = decl.target.as_deref().unwrap_or_default();
            let template = match &decl.path {
                Some(raw) => PathTemplate::parse(raw)?,
                None => PathTemplate::parse(&format!("{}/{{{}}}", plural(target), ID_PLACEHOLDER))?,
            };
            for placeholder in template.placeholders() {
                if placeholder != ID_PLACEHOLDER && !declares(owner, placeholder) {
                    return Err(unknown(placeholder, "parent"));
                }
            }
            Some(if template.has_placeholder(ID_PLACEHOLDER) {
                template
            } else {
                template.with_id_suffix()
            })
        }
        FieldKind::Collection => {
            let target = decl.target.as_deref().unwrap_or_default();
            let Some(element) = by_name.get(target) else {
                return Err(DocTrackError::InvalidCollectionTarget {
                    entity_type: owner.type_name.clone(),
                    field: decl.name.clone(),
                    target: target.to_string(),
                });
            };
            let raw = decl.path.as_deref().unwrap_or(&decl.name);
            let mut template = PathTemplate::parse(raw)?;
            if !template.has_placeholders() {
                template = template.with_id_suffix();
            }
            for placeholder in template.placeholders() {
                let known = if placeholder == ID_PLACEHOLDER {
                    has_id(element)
                } else {
                    declares(element, placeholder)
                };
                if !known {
                    return Err(unknown(placeholder, "child"));
                }
            }
            Some(template)
        }
        FieldKind::Id | FieldKind::GeoPoint | FieldKind::Plain => None,
    };

    Ok(FieldDescriptor {
        name: decl.name.clone(),
        kind: decl.kind,
        target: decl.target.clone(),
        template,
    })
}
