//! Domain-facing data model
//!
//! Entities hand the tracker a [`Record`]: their type name plus an ordered
//! list of field values. Everything downstream (serializer, differ,
//! compiler) works from records and the registered metadata.

pub mod change_type;
pub mod record;

pub use change_type::ChangeType;
pub use record::{Entity, FieldValue, Record};
