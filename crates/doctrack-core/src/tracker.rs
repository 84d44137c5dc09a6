//! Unit-of-work change tracker
//!
//! Entities are registered with a change type. At save time each tracked
//! entity is turned into commands:
//!
//! | state | commands |
//! |-------|----------|
//! | ADDED | CREATE for every node of the current snapshot |
//! | MODIFIED | UPDATE from the diff against the registration snapshot |
//! | DELETED | DELETE for every node of the registration snapshot |
//! | UNCHANGED | none |
//!
//! All batches are compiled before the first one is handed to the dialect, so
//! a serialization or compilation error never leaves a half-executed unit of
//! work behind. Backend errors abort the loop and propagate; the tracker is
//! only cleared after every batch succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use doctrack_core_types::{CorrelationContext, TraceId};

use crate::commands::{AbstractCommand, Operation};
use crate::compiler::{CommandCompiler, CompileMode};
use crate::dialect::Dialect;
use crate::diff::diff;
use crate::errors::{DocTrackError, Result};
use crate::metadata::MetadataRegistry;
use crate::model::{ChangeType, Entity, Record};
use crate::snapshot::{Snapshot, SnapshotSerializer};
use crate::{log_op_end, log_op_error, log_op_start};

/// Tracker configuration
#[derive(Debug, Clone, Default)]
pub struct TrackerOptions {
    pub compile_mode: CompileMode,
    /// Trace id of the enclosing request, stamped on log lines
    pub trace_id: Option<TraceId>,
}

/// Identity of a tracked entity: registered type plus id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: String,
    pub entity_id: String,
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// One tracked entity
#[derive(Debug, Clone)]
pub struct TrackedEntity {
    key: EntityKey,
    state: ChangeType,
    current: Record,
    original: Snapshot,
    original_digest: String,
}

impl TrackedEntity {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn state(&self) -> ChangeType {
        self.state
    }

    pub fn current(&self) -> &Record {
        &self.current
    }

    /// Snapshot taken when the entity was first registered
    pub fn original_snapshot(&self) -> &Snapshot {
        &self.original
    }
}

/// Commands compiled for one tracked entity
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub key: EntityKey,
    pub state: ChangeType,
    pub commands: Vec<AbstractCommand>,
}

/// Outcome of a successful `save_changes`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Entities that produced at least one command
    pub entities: usize,
    /// Commands handed to the dialect
    pub commands: usize,
}

pub struct ChangeTracker<D: Dialect> {
    registry: Arc<MetadataRegistry>,
    dialect: D,
    options: TrackerOptions,
    context: CorrelationContext,
    entries: Vec<TrackedEntity>,
    index: HashMap<EntityKey, usize>,
}

impl<D: Dialect> ChangeTracker<D> {
    pub fn new(registry: Arc<MetadataRegistry>, dialect: D) -> Self {
        Self::with_options(registry, dialect, TrackerOptions::default())
    }

    pub fn with_options(registry: Arc<MetadataRegistry>, dialect: D, options: TrackerOptions) -> Self {
        let mut context = CorrelationContext::new();
        if let Some(trace_id) = options.trace_id.clone() {
            context = context.with_trace_id(trace_id);
        }
        Self {
            registry,
            dialect,
            options,
            context,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn context(&self) -> &CorrelationContext {
        &self.context
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn dialect_mut(&mut self) -> &mut D {
        &mut self.dialect
    }

    pub fn into_dialect(self) -> D {
        self.dialect
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked entities in registration order
    pub fn tracked(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entries.iter()
    }

    /// Register an entity or change its state
    ///
    /// # Errors
    ///
    /// See [`set_record`](Self::set_record).
    pub fn set_entity<E: Entity>(&mut self, entity: &E, state: ChangeType) -> Result<()> {
        self.set_record(entity.to_record(), state)
    }

    /// Register a record or change its state
    ///
    /// The first registration captures the original snapshot. Re-registering
    /// an entity must follow the change-type state machine and replaces the
    /// current value; the original snapshot is kept.
    ///
    /// # Errors
    ///
    /// `UnknownEntityType`, `MissingId`, serialization errors on first
    /// registration, `InvalidStateTransition` on a forbidden re-registration.
    pub fn set_record(&mut self, record: Record, state: ChangeType) -> Result<()> {
        let key = self.key_of(&record)?;

        if let Some(&i) = self.index.get(&key) {
            let entry = &mut self.entries[i];
            if !entry.state.can_transition_to(state) {
                return Err(DocTrackError::InvalidStateTransition {
                    entity: key.to_string(),
                    from: entry.state,
                    to: state,
                });
            }
            tracing::debug!(
                entity = %key,
                from = entry.state.as_str(),
                to = state.as_str(),
                "change type updated"
            );
            entry.state = state;
            entry.current = record;
            return Ok(());
        }

        let original = SnapshotSerializer::new(&self.registry).serialize(&record)?;
        let original_digest = original.digest();
        tracing::debug!(entity = %key, change_type = state.as_str(), "entity registered");
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(TrackedEntity {
            key,
            state,
            current: record,
            original,
            original_digest,
        });
        Ok(())
    }

    /// Replace the current value of a tracked entity without changing its state
    ///
    /// # Errors
    ///
    /// `NotTracked` when the entity was never registered.
    pub fn refresh_entity<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let record = entity.to_record();
        let key = self.key_of(&record)?;
        let &i = self
            .index
            .get(&key)
            .ok_or_else(|| DocTrackError::NotTracked {
                entity: key.to_string(),
            })?;
        self.entries[i].current = record;
        Ok(())
    }

    /// Current state of an entity, if tracked
    pub fn state_of<E: Entity>(&self, entity: &E) -> Option<ChangeType> {
        let key = self.key_of(&entity.to_record()).ok()?;
        self.index.get(&key).map(|&i| self.entries[i].state)
    }

    pub fn is_tracked<E: Entity>(&self, entity: &E) -> bool {
        self.state_of(entity).is_some()
    }

    /// Forget every tracked entity
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Compile commands for every tracked entity without executing them
    ///
    /// Batches come back in registration order, unsorted, and entities that
    /// produce no commands are omitted.
    ///
    /// # Errors
    ///
    /// Serialization and compilation errors.
    pub fn pending_batches(&self) -> Result<Vec<PendingBatch>> {
        let serializer = SnapshotSerializer::new(&self.registry);
        let compiler = CommandCompiler::new(&self.registry, self.options.compile_mode);

        let mut batches = Vec::new();
        for entry in &self.entries {
            let commands = match entry.state {
                ChangeType::Unchanged => Vec::new(),
                ChangeType::Added => {
                    let current = serializer.serialize(&entry.current)?;
                    compiler.compile(&current, 0, Operation::Create)?
                }
                ChangeType::Modified => {
                    let current = serializer.serialize(&entry.current)?;
                    if current.digest() == entry.original_digest {
                        tracing::debug!(entity = %entry.key, "modified entity has no changes");
                        Vec::new()
                    } else {
                        let changes = diff(&entry.original, &current);
                        tracing::debug!(
                            entity = %entry.key,
                            changed_paths = changes.len(),
                            "entity diffed"
                        );
                        compiler.compile_update(&changes, &current)?
                    }
                }
                ChangeType::Deleted => compiler.compile(&entry.original, 0, Operation::Delete)?,
            };
            if !commands.is_empty() {
                batches.push(PendingBatch {
                    key: entry.key.clone(),
                    state: entry.state,
                    commands,
                });
            }
        }
        Ok(batches)
    }

    /// Persist every tracked change through the dialect
    ///
    /// # Errors
    ///
    /// Compilation errors (before any execution) and the first dialect error.
    /// The tracker keeps its entries on error.
    pub fn save_changes<'s>(&mut self, session: &mut D::Session<'s>) -> Result<SaveSummary> {
        let start = Instant::now();
        let unit_of_work_id = self.context.unit_of_work_id.to_string();
        let trace_id = self
            .context
            .trace_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        log_op_start!(
            "save_changes",
            unit_of_work_id = %unit_of_work_id,
            trace_id = %trace_id,
            tracked_count = self.entries.len()
        );

        let result = self.execute_pending(session);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(summary) => {
                self.clear();
                log_op_end!(
                    "save_changes",
                    duration_ms = duration_ms,
                    unit_of_work_id = %unit_of_work_id,
                    command_count = summary.commands
                );
                Ok(summary)
            }
            Err(err) => {
                log_op_error!(
                    "save_changes",
                    err.clone(),
                    duration_ms = duration_ms,
                    unit_of_work_id = %unit_of_work_id
                );
                Err(err)
            }
        }
    }

    fn execute_pending<'s>(&mut self, session: &mut D::Session<'s>) -> Result<SaveSummary> {
        let batches = self.pending_batches()?;
        let mut summary = SaveSummary::default();
        for batch in batches {
            let sorted = self.dialect.sort_commands(batch.commands, batch.state);
            tracing::debug!(
                entity = %batch.key,
                change_type = batch.state.as_str(),
                command_count = sorted.len(),
                "executing batch"
            );
            self.dialect
                .execute_commands(session, &sorted)
                .map_err(|err| self.stamp(err, &batch.key))?;
            summary.entities += 1;
            summary.commands += sorted.len();
        }
        Ok(summary)
    }

    /// Attach this unit of work's correlation to a backend error
    fn stamp(&self, err: DocTrackError, key: &EntityKey) -> DocTrackError {
        let DocTrackError::Backend(mut ex) = err else {
            return err;
        };
        ex = ex.with_unit_of_work_id(self.context.unit_of_work_id.clone());
        if let Some(trace_id) = &self.context.trace_id {
            ex = ex.with_trace_id(trace_id.clone());
        }
        if ex.entity_id().is_none() {
            ex = ex.with_entity_id(key.to_string());
        }
        DocTrackError::Backend(ex)
    }

    fn key_of(&self, record: &Record) -> Result<EntityKey> {
        let meta = self
            .registry
            .get(record.type_name())
            .ok_or_else(|| DocTrackError::UnknownEntityType {
                entity_type: record.type_name().to_string(),
            })?;
        let entity_id = meta.id_of(record).ok_or_else(|| DocTrackError::MissingId {
            entity_type: record.type_name().to_string(),
        })?;
        Ok(EntityKey {
            entity_type: record.type_name().to_string(),
            entity_id,
        })
    }
}
