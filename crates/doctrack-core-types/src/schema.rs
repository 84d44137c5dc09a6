//! Canonical schema constants for structured logging and events
//!
//! Every log line emitted by the engine uses these keys so that captured
//! events can be asserted on without string drift.

// Operation envelope
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Correlation
pub const FIELD_UNIT_OF_WORK_ID: &str = "unit_of_work_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Tracking
pub const FIELD_ENTITY_TYPE: &str = "entity_type";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_CHANGE_TYPE: &str = "change_type";
pub const FIELD_ENTITY_PATH: &str = "entity_path";

// Batch sizes
pub const FIELD_TRACKED_COUNT: &str = "tracked_count";
pub const FIELD_COMMAND_COUNT: &str = "command_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
