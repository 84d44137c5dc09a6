//! Core types shared by the doctrack error and logging facilities
//!
//! - **Correlation types**: UnitOfWorkId, TraceId, CorrelationContext
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{CorrelationContext, TraceId, UnitOfWorkId};
