use doctrack_core_types::{TraceId, UnitOfWorkId};
use thiserror::Error;

use crate::model::ChangeType;

/// Result type alias using DocTrackError
pub type Result<T> = std::result::Result<T, DocTrackError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure the engine or a storage backend can produce maps onto one of
/// these kinds. Each kind carries a stable code suitable for assertions and
/// for exit diagnostics in the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Tracking
    InvalidStateTransition,
    NotTracked,
    MissingId,

    // Metadata configuration
    Configuration,
    UnknownEntityType,

    // Serialization / compilation
    UnresolvedPath,
    MissingIdentity,
    InvalidValue,
    InvalidPath,
    UnsupportedOperation,

    // Document store
    NotFound,
    AlreadyExists,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Timeout,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidStateTransition => "ERR_INVALID_STATE_TRANSITION",
            ExErrorKind::NotTracked => "ERR_NOT_TRACKED",
            ExErrorKind::MissingId => "ERR_MISSING_ID",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::UnknownEntityType => "ERR_UNKNOWN_ENTITY_TYPE",
            ExErrorKind::UnresolvedPath => "ERR_UNRESOLVED_PATH",
            ExErrorKind::MissingIdentity => "ERR_MISSING_IDENTITY",
            ExErrorKind::InvalidValue => "ERR_INVALID_VALUE",
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::UnsupportedOperation => "ERR_UNSUPPORTED_OPERATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
        }
    }
}

/// Canonical structured error type
///
/// Storage backends report failures through this type so that a dialect error
/// can travel through `save_changes` untouched.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    path: Option<String>,
    unit_of_work_id: Option<UnitOfWorkId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            path: None,
            unit_of_work_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add document path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add unit-of-work context; the change tracker stamps it on backend errors
    pub fn with_unit_of_work_id(mut self, id: UnitOfWorkId) -> Self {
        self.unit_of_work_id = Some(id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the document path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the unit-of-work context, if any
    pub fn unit_of_work_id(&self) -> Option<&UnitOfWorkId> {
        self.unit_of_work_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for change tracking, serialization and compilation
#[derive(Error, Debug, Clone)]
pub enum DocTrackError {
    // ===== Tracking =====
    /// State change not permitted by the change-type state machine
    #[error("Invalid state transition for {entity}: {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: ChangeType,
        to: ChangeType,
    },

    /// Entity is not registered with the tracker
    #[error("Entity is not tracked: {entity}")]
    NotTracked { entity: String },

    /// Tracked entity or aggregate root carries no id value
    #[error("Entity of type {entity_type} has no id value")]
    MissingId { entity_type: String },

    // ===== Metadata configuration =====
    /// Entity type has not been registered
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    /// Entity type registered twice
    #[error("Entity type registered more than once: {entity_type}")]
    DuplicateEntityType { entity_type: String },

    /// Field declared twice on the same entity type
    #[error("Field {field} declared more than once on {entity_type}")]
    DuplicateField { entity_type: String, field: String },

    /// More than one Id field on the same entity type
    #[error("Entity type {entity_type} declares more than one id field")]
    MultipleIdFields { entity_type: String },

    /// Path template could not be parsed
    #[error("Invalid path template '{template}': {reason}")]
    InvalidPathTemplate { template: String, reason: String },

    /// Path template names an attribute that does not exist on the entity it resolves against
    #[error("Placeholder {{{placeholder}}} in {entity_type}.{field} does not name a {side} field")]
    UnknownPlaceholder {
        entity_type: String,
        field: String,
        placeholder: String,
        side: String,
    },

    /// Collection field points at something that is not a registered entity type with an id
    #[error("Collection field {entity_type}.{field} targets {target}, which is not an identifiable entity type")]
    InvalidCollectionTarget {
        entity_type: String,
        field: String,
        target: String,
    },

    // ===== Serialization / compilation =====
    /// A path placeholder had no value at serialization time
    #[error("Cannot resolve {{{placeholder}}} in '{template}' for field {field}")]
    UnresolvedPath {
        field: String,
        template: String,
        placeholder: String,
    },

    /// Strict compilation met a node without identity marker
    #[error("Node at level {level} under {parent} has no identity marker")]
    MissingIdentity { parent: String, level: u32 },

    /// Collection field value is not a list of entities
    #[error("Collection field {field} must hold a list of entities")]
    InvalidCollectionValue { field: String },

    /// GeoPoint field value has an unsupported shape
    #[error("GeoPoint field {field} must hold a point, a [latitude, longitude] pair or a {{latitude, longitude}} map")]
    InvalidGeoPoint { field: String },

    /// Malformed document path
    #[error("Invalid document path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Operation not supported by the requested code path
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    // ===== Document store =====
    /// CREATE targeted a path that already holds a document
    #[error("Document already exists: {path}")]
    DocumentAlreadyExists { path: String },

    /// UPDATE targeted a path with no document
    #[error("Document not found: {path}")]
    DocumentNotFound { path: String },

    /// Snapshot could not be converted to or from JSON
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    // ===== Backends =====
    /// Failure raised by a dialect or storage backend
    #[error(transparent)]
    Backend(#[from] ExError),
}

/// Conversion from DocTrackError to ExError
impl From<DocTrackError> for ExError {
    fn from(err: DocTrackError) -> Self {
        let message = err.to_string();
        match err {
            DocTrackError::InvalidStateTransition { entity, .. } => {
                ExError::new(ExErrorKind::InvalidStateTransition)
                    .with_entity_id(entity)
                    .with_message(message)
            }
            DocTrackError::NotTracked { entity } => ExError::new(ExErrorKind::NotTracked)
                .with_entity_id(entity)
                .with_message(message),
            DocTrackError::MissingId { entity_type } => ExError::new(ExErrorKind::MissingId)
                .with_entity_id(entity_type)
                .with_message(message),
            DocTrackError::UnknownEntityType { entity_type } => {
                ExError::new(ExErrorKind::UnknownEntityType)
                    .with_entity_id(entity_type)
                    .with_message(message)
            }
            DocTrackError::DuplicateEntityType { .. }
            | DocTrackError::DuplicateField { .. }
            | DocTrackError::MultipleIdFields { .. }
            | DocTrackError::InvalidPathTemplate { .. }
            | DocTrackError::UnknownPlaceholder { .. }
            | DocTrackError::InvalidCollectionTarget { .. } => {
                ExError::new(ExErrorKind::Configuration).with_message(message)
            }
            DocTrackError::UnresolvedPath { .. } => {
                ExError::new(ExErrorKind::UnresolvedPath).with_message(message)
            }
            DocTrackError::MissingIdentity { parent, .. } => {
                ExError::new(ExErrorKind::MissingIdentity)
                    .with_path(parent)
                    .with_message(message)
            }
            DocTrackError::InvalidCollectionValue { .. } | DocTrackError::InvalidGeoPoint { .. } => {
                ExError::new(ExErrorKind::InvalidValue).with_message(message)
            }
            DocTrackError::InvalidPath { path, .. } => ExError::new(ExErrorKind::InvalidPath)
                .with_path(path)
                .with_message(message),
            DocTrackError::UnsupportedOperation { .. } => {
                ExError::new(ExErrorKind::UnsupportedOperation).with_message(message)
            }
            DocTrackError::DocumentAlreadyExists { path } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_path(path)
                    .with_message(message)
            }
            DocTrackError::DocumentNotFound { path } => ExError::new(ExErrorKind::NotFound)
                .with_path(path)
                .with_message(message),
            DocTrackError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            DocTrackError::Backend(ex) => ex,
        }
    }
}

impl From<serde_json::Error> for DocTrackError {
    fn from(err: serde_json::Error) -> Self {
        DocTrackError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (
                ExErrorKind::InvalidStateTransition,
                "ERR_INVALID_STATE_TRANSITION",
            ),
            (ExErrorKind::UnresolvedPath, "ERR_UNRESOLVED_PATH"),
            (ExErrorKind::Configuration, "ERR_CONFIGURATION"),
            (ExErrorKind::MissingIdentity, "ERR_MISSING_IDENTITY"),
            (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_transition_error_maps_to_kind() {
        let err = DocTrackError::InvalidStateTransition {
            entity: "Store:s1".to_string(),
            from: ChangeType::Added,
            to: ChangeType::Modified,
        };
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::InvalidStateTransition);
        assert_eq!(ex.entity_id(), Some("Store:s1"));
        assert!(ex.message().contains("ADDED -> MODIFIED"));
    }

    #[test]
    fn test_configuration_errors_share_kind() {
        let err = DocTrackError::UnknownPlaceholder {
            entity_type: "Store".to_string(),
            field: "products".to_string(),
            placeholder: "sku".to_string(),
            side: "child".to_string(),
        };
        let ex: ExError = err.into();
        assert_eq!(ex.code(), "ERR_CONFIGURATION");
        assert!(ex.message().contains("{sku}"));
    }

    #[test]
    fn test_backend_error_passes_through() {
        let inner = ExError::new(ExErrorKind::Persistence)
            .with_op("sqlite")
            .with_message("disk full");
        let err: DocTrackError = inner.into();
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::Persistence);
        assert_eq!(ex.op(), Some("sqlite"));
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("apply")
            .with_path("stores/s1")
            .with_message("Document not found");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_NOT_FOUND] in operation 'apply'"));
        assert!(rendered.contains("(path: stores/s1)"));
    }
}
