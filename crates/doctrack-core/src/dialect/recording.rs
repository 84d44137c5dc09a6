use super::Dialect;
use crate::commands::AbstractCommand;
use crate::errors::{ExError, Result};

/// Dialect that keeps every executed batch in memory
///
/// Useful for inspecting what a unit of work would do. A failure can be
/// armed to exercise error paths.
#[derive(Debug, Default)]
pub struct RecordingDialect {
    batches: Vec<Vec<AbstractCommand>>,
    failure: Option<ExError>,
}

impl RecordingDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `execute_commands` call with `error`
    pub fn fail_next(&mut self, error: ExError) {
        self.failure = Some(error);
    }

    /// Batches in execution order, one per entity
    pub fn batches(&self) -> &[Vec<AbstractCommand>] {
        &self.batches
    }

    /// All executed commands, flattened
    pub fn executed(&self) -> Vec<&AbstractCommand> {
        self.batches.iter().flatten().collect()
    }

    /// Drain the recorded batches
    pub fn take(&mut self) -> Vec<Vec<AbstractCommand>> {
        std::mem::take(&mut self.batches)
    }
}

impl Dialect for RecordingDialect {
    type Session<'s> = ();

    fn execute_commands<'s>(&mut self, _session: &mut (), commands: &[AbstractCommand]) -> Result<()> {
        if let Some(error) = self.failure.take() {
            return Err(error.into());
        }
        self.batches.push(commands.to_vec());
        Ok(())
    }
}
