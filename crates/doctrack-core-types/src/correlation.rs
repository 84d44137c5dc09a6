//! Correlation types for unit-of-work tracking
//!
//! A change tracker is scoped to one logical transaction. These ids let log
//! lines and errors from the same unit of work be stitched back together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Get the string representation
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an id minted elsewhere (e.g. an inbound request header)
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Identifier of one unit of work (one change tracker lifetime)
    UnitOfWorkId
);

correlation_id!(
    /// Trace identifier propagated from an outer request, if any
    TraceId
);

/// Correlation carried by a change tracker and stamped on its log lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    pub unit_of_work_id: UnitOfWorkId,
    pub trace_id: Option<TraceId>,
}

impl CorrelationContext {
    /// Start a new context with a fresh unit-of-work id
    pub fn new() -> Self {
        Self {
            unit_of_work_id: UnitOfWorkId::new(),
            trace_id: None,
        }
    }

    /// Attach the trace id of the enclosing request
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}
