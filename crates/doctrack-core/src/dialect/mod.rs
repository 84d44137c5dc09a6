//! Backend boundary
//!
//! A dialect decides the order in which one entity's commands run and then
//! executes them against a backend session. The tracker owns the dialect;
//! the caller owns the session (a transaction, a client, an in-memory tree)
//! and passes it to every `save_changes` call.

pub mod console;
pub mod memory;
pub mod recording;

pub use console::ConsoleDialect;
pub use memory::MemoryDialect;
pub use recording::RecordingDialect;

use crate::commands::{AbstractCommand, Operation};
use crate::errors::Result;
use crate::model::ChangeType;

pub trait Dialect {
    /// Backend handle commands are executed against
    type Session<'s>;

    /// Order one entity's commands for execution
    ///
    /// The default orders parents before children for CREATE and UPDATE and
    /// children before parents for DELETE.
    fn sort_commands(
        &self,
        commands: Vec<AbstractCommand>,
        change_type: ChangeType,
    ) -> Vec<AbstractCommand> {
        sort_by_level(commands, change_type)
    }

    /// Execute one entity's sorted commands
    ///
    /// # Errors
    ///
    /// Backend failures, reported as `DocTrackError::Backend` or a document
    /// store error; the tracker propagates them unchanged.
    fn execute_commands<'s>(
        &mut self,
        session: &mut Self::Session<'s>,
        commands: &[AbstractCommand],
    ) -> Result<()>;
}

/// Stable sort by tree level
///
/// Ascending for ADDED, descending for DELETED. A MODIFIED batch runs its
/// CREATE and UPDATE commands ascending, then its DELETE commands descending,
/// so a removed subtree goes children first. Commands on the same level keep
/// their compiled order.
pub fn sort_by_level(mut commands: Vec<AbstractCommand>, change_type: ChangeType) -> Vec<AbstractCommand> {
    match change_type {
        ChangeType::Deleted => commands.sort_by(|a, b| b.level().cmp(&a.level())),
        ChangeType::Modified => {
            let (mut deletes, mut writes): (Vec<_>, Vec<_>) = commands
                .into_iter()
                .partition(|c| c.operation() == Operation::Delete);
            writes.sort_by_key(AbstractCommand::level);
            deletes.sort_by(|a, b| b.level().cmp(&a.level()));
            writes.extend(deletes);
            return writes;
        }
        _ => commands.sort_by_key(AbstractCommand::level),
    }
    commands
}
