//! Reads and writes against the `documents` table
//!
//! Document bodies are stored as the JSON form of their snapshot mapping, so
//! identity and reference markers survive the round trip.

use crate::errors::{corrupt_document, from_rusqlite, Result};
use doctrack_core::{DocPath, Document, Snapshot};
use rusqlite::{Connection, OptionalExtension};

/// Fetch one document by full path
///
/// # Errors
///
/// `Persistence` on query failure, `Serialization` if the stored JSON is corrupt.
pub fn get_document(conn: &Connection, path: &str) -> Result<Option<Document>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE path = ?1",
            [path],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    data.map(|raw| decode(path, &raw)).transpose()
}

/// Documents directly inside `collection` (e.g. `stores/s1/products`), by path
///
/// # Errors
///
/// `Persistence` on query failure, `Serialization` if a stored row is corrupt.
pub fn list_collection(conn: &Connection, collection: &str) -> Result<Vec<(String, Document)>> {
    let mut stmt = conn
        .prepare("SELECT path, data FROM documents WHERE collection = ?1 ORDER BY path")
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter()
        .map(|(path, raw)| {
            let doc = decode(&path, &raw)?;
            Ok((path, doc))
        })
        .collect()
}

/// Paths of documents owned by `parent` one level down
///
/// # Errors
///
/// `Persistence` on query failure.
pub fn child_paths(conn: &Connection, parent: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT path FROM documents WHERE parent_path = ?1 ORDER BY path")
        .map_err(from_rusqlite)?;
    let paths = stmt
        .query_map([parent], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(paths)
}

/// Number of stored documents
///
/// # Errors
///
/// `Persistence` on query failure.
pub fn count_documents(conn: &Connection) -> Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n.max(0) as u64)
    .map_err(from_rusqlite)
}

pub(crate) fn insert_document(conn: &Connection, path: &DocPath, doc: &Document) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO documents (path, collection, parent_path, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![
            path.as_str(),
            path.parent().unwrap_or_default(),
            path.parent_document(),
            encode(doc),
            now,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

pub(crate) fn update_document(conn: &Connection, path: &DocPath, doc: &Document) -> Result<()> {
    conn.execute(
        "UPDATE documents SET data = ?2, updated_at = ?3 WHERE path = ?1",
        rusqlite::params![path.as_str(), encode(doc), chrono::Utc::now().timestamp()],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

pub(crate) fn delete_document(conn: &Connection, path: &DocPath) -> Result<()> {
    conn.execute("DELETE FROM documents WHERE path = ?1", [path.as_str()])
        .map_err(from_rusqlite)?;
    Ok(())
}

fn encode(doc: &Document) -> String {
    Snapshot::Mapping(doc.clone()).to_json().to_string()
}

fn decode(path: &str, raw: &str) -> Result<Document> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| corrupt_document(path, &e.to_string()))?;
    match Snapshot::from_json(&value) {
        Ok(Snapshot::Mapping(fields)) => Ok(fields),
        Ok(_) => Err(corrupt_document(path, "document body is not an object")),
        Err(e) => Err(corrupt_document(path, &e.to_string())),
    }
}
