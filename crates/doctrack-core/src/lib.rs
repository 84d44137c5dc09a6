//! DocTrack Core - change tracking and command compilation for document stores
//!
//! This crate turns in-memory entity graphs into backend-neutral persistence
//! commands:
//! - Entity metadata: declarative field tables and path templates
//! - Snapshot serializer: entity graph → plain data with identity markers
//! - Structural differ: original vs current snapshot, keyed by field path
//! - Command compiler: CREATE/UPDATE/DELETE commands with tree levels
//! - Change tracker: unit of work over registered entities
//! - Dialects: ordering and execution against a backend session

pub use doctrack_core_types;

pub mod apply;
pub mod commands;
pub mod compiler;
pub mod dialect;
pub mod diff;
pub mod document_store;
pub mod errors;
pub mod field_path;
pub mod logging_facility;
pub mod metadata;
pub mod model;
pub mod snapshot;
pub mod tracker;

// Re-export commonly used types
pub use apply::{apply_command, Document};
pub use commands::{AbstractCommand, ArrayOperation, Operation};
pub use compiler::{CommandCompiler, CompileMode};
pub use dialect::{ConsoleDialect, Dialect, MemoryDialect, RecordingDialect};
pub use diff::{diff, DiffResult};
pub use document_store::MemoryDocumentStore;
pub use errors::{DocTrackError, ExError, ExErrorKind, Result};
pub use metadata::{EntitySchema, FieldKind, MetadataRegistry};
pub use model::{ChangeType, Entity, FieldValue, Record};
pub use snapshot::{DocPath, EntityPath, GeoPoint, Snapshot, SnapshotSerializer};
pub use tracker::{ChangeTracker, SaveSummary, TrackerOptions};
