use super::Dialect;
use crate::commands::AbstractCommand;
use crate::document_store::MemoryDocumentStore;
use crate::errors::Result;

/// Dialect executing against a [`MemoryDocumentStore`] session
///
/// Each entity's batch is applied atomically.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDialect;

impl Dialect for MemoryDialect {
    type Session<'s> = MemoryDocumentStore;

    fn execute_commands<'s>(
        &mut self,
        session: &mut MemoryDocumentStore,
        commands: &[AbstractCommand],
    ) -> Result<()> {
        session.apply_batch(commands)
    }
}
