//! Entity metadata: declarations, path templates and the validated registry

pub mod inflect;
pub mod registry;
pub mod schema;
pub mod template;

pub use inflect::plural;
pub use registry::{EntityMetadata, FieldDescriptor, MetadataRegistry, RegistryBuilder};
pub use schema::{EntitySchema, FieldKind};
pub use template::PathTemplate;
