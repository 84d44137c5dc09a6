pub mod get;
pub mod list;
pub mod migrate;

use std::path::Path;

use doctrack_core::errors::{ExError, ExErrorKind};
use doctrack_core::{Document, Snapshot};
use rusqlite::Connection;

/// Open a database that must already exist
///
/// Read commands never create a database file as a side effect.
fn open_existing(db: &Path) -> Result<Connection, ExError> {
    if !db.exists() {
        return Err(ExError::new(ExErrorKind::NotFound)
            .with_op("open_database")
            .with_path(db.display().to_string())
            .with_message("database does not exist; run `doctrack migrate` first"));
    }
    doctrack_store::db::open(db)
}

/// JSON form of a stored document, markers included
fn document_json(doc: &Document) -> serde_json::Value {
    Snapshot::Mapping(doc.clone()).to_json()
}
