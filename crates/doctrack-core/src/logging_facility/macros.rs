//! Canonical logging macros
//!
//! Every operation boundary logs through these so that `component`, `op` and
//! `event` are always present and spelled the same way. Extra `tracing`
//! fields may follow the fixed ones.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use doctrack_core::log_op_start;
/// log_op_start!("save_changes");
/// log_op_start!("save_changes", tracked_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::doctrack_core_types::schema::EVENT_START,
            $($($field)*)?
        );
    };
}

/// Log the successful end of an operation, with its duration
///
/// # Example
///
/// ```
/// # use doctrack_core::log_op_end;
/// log_op_end!("save_changes", duration_ms = 42);
/// log_op_end!("save_changes", duration_ms = 42, command_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::doctrack_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        );
    };
}

/// Log an operation error
///
/// The error is converted into an `ExError` so its kind and stable code are
/// logged as structured fields.
///
/// # Example
///
/// ```
/// # use doctrack_core::{log_op_error, errors::DocTrackError};
/// let err = DocTrackError::NotTracked { entity: "Store:s1".to_string() };
/// log_op_error!("refresh_entity", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::doctrack_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($($field)*)?
        );
    }};
}
