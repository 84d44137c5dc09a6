//! DocTrack Store - SQLite backend for the change tracker
//!
//! Provides:
//! - Connection helpers and embedded, checksummed migrations
//! - `SqliteDialect`, executing command batches inside a caller-owned transaction
//! - Read queries over the persisted document tree

pub mod db;
pub mod dialect;
pub mod documents;
pub mod errors;
pub mod migrations;

// Re-export key types
pub use dialect::{save_in_transaction, SqliteDialect};
pub use errors::Result;
