//! SQLite dialect
//!
//! The session is a `rusqlite::Transaction` owned by the caller. Each
//! entity's batch runs inside a savepoint, so a failing batch leaves no
//! partial writes and the caller decides whether to commit what came before.

use crate::documents::{delete_document, get_document, insert_document, update_document};
use crate::errors::from_rusqlite;
use doctrack_core::dialect::Dialect;
use doctrack_core::{apply_command, AbstractCommand, ChangeTracker, SaveSummary};
use rusqlite::{Connection, Transaction};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    type Session<'s> = Transaction<'s>;

    fn execute_commands<'s>(
        &mut self,
        session: &mut Transaction<'s>,
        commands: &[AbstractCommand],
    ) -> doctrack_core::Result<()> {
        let sp = session.savepoint().map_err(from_rusqlite)?;
        for command in commands {
            execute_one(&sp, command)?;
        }
        sp.commit().map_err(from_rusqlite)?;
        Ok(())
    }
}

fn execute_one(conn: &Connection, command: &AbstractCommand) -> doctrack_core::Result<()> {
    let path = command.path();
    let existing = get_document(conn, path.as_str())?;
    let next = apply_command(existing.as_ref(), command)?;

    match (existing.is_some(), next) {
        (true, None) => delete_document(conn, path)?,
        (false, None) => {}
        (false, Some(doc)) => insert_document(conn, path, &doc)?,
        (true, Some(doc)) => update_document(conn, path, &doc)?,
    }

    tracing::debug!(
        operation = command.operation().as_str(),
        path = path.as_str(),
        level = command.level(),
        "command applied"
    );
    Ok(())
}

/// Save a tracker's changes in one transaction, committing only on success
///
/// # Errors
///
/// Any error from `save_changes`; the transaction is rolled back.
pub fn save_in_transaction(
    conn: &mut Connection,
    tracker: &mut ChangeTracker<SqliteDialect>,
) -> doctrack_core::Result<SaveSummary> {
    let mut tx = conn.transaction().map_err(from_rusqlite)?;
    let summary = tracker.save_changes(&mut tx)?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(summary)
}
