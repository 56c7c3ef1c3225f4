//! Host lifecycle hooks.
//!
//! The host fires hooks in this order during a flush:
//!
//! 1. `on_flush` once, when the set of deletions is final
//! 2. `post_persist` for every inserted instance, once generated identifiers
//!    are known
//! 3. `pre_update` for every updated instance while its change set is known,
//!    then `post_update` once the update was written
//!
//! Deletions have no post-commit hook, so their rows are written during
//! `on_flush` from the last known state.
//!
//! # Usage
//!
//! ```rust,ignore
//! let listener = AuditListener::new(AuditConfig::default(), Arc::new(registry));
//! let mut tx = listener.begin_transaction();
//!
//! listener.on_flush(&mut tx, &mut conn, &uow)?;
//! listener.pre_update(&mut tx, &uow, &invoice, changes)?;
//! listener.post_update(&mut tx, &mut conn, &uow, &invoice)?;
//!
//! tx.commit()?;
//! ```

use crate::change_set::ChangeRecord;
use crate::clock::{Clock, SystemClock};
use crate::config::AuditConfig;
use crate::entity::{EntityData, EntityRef, UnitOfWork};
use crate::error::{AuditError, AuditResult};
use crate::metadata::{EntityTypeDescriptor, MetadataSource};
use crate::sql::StatementCache;
use crate::transaction::AuditTransaction;
use crate::types::{OperationKind, RevisionId, TransactionId};
use crate::writer::RevisionWriter;
use entaudit_driver::Connection;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// A host hook the listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Before an instance's update is written.
    PreUpdate,
    /// When the flush's deletions are known.
    OnFlush,
    /// After an instance was inserted.
    PostPersist,
    /// After an instance was updated.
    PostUpdate,
}

impl LifecycleEvent {
    /// Returns the hook name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LifecycleEvent::PreUpdate => "pre_update",
            LifecycleEvent::OnFlush => "on_flush",
            LifecycleEvent::PostPersist => "post_persist",
            LifecycleEvent::PostUpdate => "post_update",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One fired hook with its arguments.
#[derive(Debug, Clone)]
pub enum HostEvent<'a> {
    /// See [`AuditListener::pre_update`].
    PreUpdate {
        /// Instance being updated.
        entity: &'a EntityRef,
        /// Its field-level changes.
        changes: ChangeRecord,
    },
    /// See [`AuditListener::on_flush`].
    OnFlush,
    /// See [`AuditListener::post_persist`].
    PostPersist {
        /// Inserted instance.
        entity: &'a EntityRef,
    },
    /// See [`AuditListener::post_update`].
    PostUpdate {
        /// Updated instance.
        entity: &'a EntityRef,
    },
}

impl HostEvent<'_> {
    /// Returns the hook this event fires.
    #[must_use]
    pub const fn kind(&self) -> LifecycleEvent {
        match self {
            HostEvent::PreUpdate { .. } => LifecycleEvent::PreUpdate,
            HostEvent::OnFlush => LifecycleEvent::OnFlush,
            HostEvent::PostPersist { .. } => LifecycleEvent::PostPersist,
            HostEvent::PostUpdate { .. } => LifecycleEvent::PostUpdate,
        }
    }
}

/// Adapts host lifecycle hooks to revision writes.
///
/// Holds the process-wide parts (configuration, metadata, clock and the
/// statement cache) and can be shared across threads. Everything scoped to
/// one host transaction lives in the [`AuditTransaction`] passed to each
/// hook.
pub struct AuditListener {
    config: AuditConfig,
    metadata: Arc<dyn MetadataSource>,
    clock: Arc<dyn Clock>,
    statements: StatementCache,
    next_txid: AtomicU64,
}

impl fmt::Debug for AuditListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditListener")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}

impl AuditListener {
    /// Creates a listener using the system clock.
    pub fn new(config: AuditConfig, metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            config,
            metadata,
            clock: Arc::new(SystemClock),
            statements: StatementCache::new(),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Replaces the clock revision timestamps are read from.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Returns the statement cache.
    #[must_use]
    pub fn statements(&self) -> &StatementCache {
        &self.statements
    }

    /// Returns the hooks the host must route to this listener.
    #[must_use]
    pub fn subscribed_events() -> &'static [LifecycleEvent] {
        &[
            LifecycleEvent::PreUpdate,
            LifecycleEvent::OnFlush,
            LifecycleEvent::PostPersist,
            LifecycleEvent::PostUpdate,
        ]
    }

    /// Opens the audit context of a new host transaction.
    pub fn begin_transaction(&self) -> AuditTransaction {
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::Relaxed));
        trace!(txid = %id, "audit transaction started");
        AuditTransaction::new(id)
    }

    /// Records the change set of an instance about to be updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction finished, or if the instance's
    /// type is audited but its identifier cannot be determined.
    pub fn pre_update(
        &self,
        tx: &mut AuditTransaction,
        uow: &dyn UnitOfWork,
        entity: &EntityRef,
        changes: ChangeRecord,
    ) -> AuditResult<()> {
        tx.ensure_active()?;
        let Some(descriptor) = self.audited_descriptor(entity.type_name())? else {
            return Ok(());
        };

        let identifier = self
            .entity_data(uow, entity, &descriptor)?
            .identifier_for(&descriptor)?;
        trace!(entity = %entity, id = %identifier, fields = changes.len(), "recorded change set");
        tx.change_sets.record(&descriptor.name, identifier, changes);
        Ok(())
    }

    /// Writes a `DEL` row for every audited instance scheduled for deletion.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns the first write error; the host must roll back.
    pub fn on_flush(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        uow: &dyn UnitOfWork,
    ) -> AuditResult<usize> {
        tx.ensure_active()?;
        let mut written = 0;
        for entity in uow.scheduled_deletions() {
            if self
                .write_entity(tx, conn, uow, &entity, OperationKind::Delete)?
                .is_some()
            {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Writes an `INS` row for an inserted instance.
    ///
    /// Returns `None` for types that are not audited.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the host must roll back.
    pub fn post_persist(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        uow: &dyn UnitOfWork,
        entity: &EntityRef,
    ) -> AuditResult<Option<RevisionId>> {
        tx.ensure_active()?;
        self.write_entity(tx, conn, uow, entity, OperationKind::Insert)
    }

    /// Writes an `UPD` row for an updated instance.
    ///
    /// Returns `None` for types that are not audited.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the host must roll back.
    pub fn post_update(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        uow: &dyn UnitOfWork,
        entity: &EntityRef,
    ) -> AuditResult<Option<RevisionId>> {
        tx.ensure_active()?;
        self.write_entity(tx, conn, uow, entity, OperationKind::Update)
    }

    /// Routes a fired hook to its handler.
    ///
    /// Returns the number of shadow rows written.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler fails with.
    pub fn dispatch(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        uow: &dyn UnitOfWork,
        event: HostEvent<'_>,
    ) -> AuditResult<usize> {
        match event {
            HostEvent::PreUpdate { entity, changes } => {
                self.pre_update(tx, uow, entity, changes).map(|()| 0)
            }
            HostEvent::OnFlush => self.on_flush(tx, conn, uow),
            HostEvent::PostPersist { entity } => self
                .post_persist(tx, conn, uow, entity)
                .map(|rev| usize::from(rev.is_some())),
            HostEvent::PostUpdate { entity } => self
                .post_update(tx, conn, uow, entity)
                .map(|rev| usize::from(rev.is_some())),
        }
    }

    fn audited_descriptor(
        &self,
        type_name: &str,
    ) -> AuditResult<Option<Arc<EntityTypeDescriptor>>> {
        if !self.metadata.is_audited(type_name) {
            return Ok(None);
        }
        self.metadata
            .descriptor(type_name)
            .map(Some)
            .ok_or_else(|| AuditError::unknown_entity_type(type_name))
    }

    /// Last known state of an instance with its current identifier and, for
    /// versioned types, its live version.
    fn entity_data(
        &self,
        uow: &dyn UnitOfWork,
        entity: &EntityRef,
        descriptor: &EntityTypeDescriptor,
    ) -> AuditResult<EntityData> {
        let mut data = uow
            .original_data(entity)
            .ok_or_else(|| AuditError::unmanaged_entity(entity.to_string()))?;
        if let Some(identifier) = uow.identifier(entity) {
            data.merge_identifier(&identifier);
        }
        if descriptor.is_versioned() {
            let version_field = descriptor.version_field.as_deref().unwrap_or_default();
            if let Some(version) = uow.live_value(entity, version_field) {
                data.set_value(version_field, version);
            }
        }
        Ok(data)
    }

    fn write_entity(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        uow: &dyn UnitOfWork,
        entity: &EntityRef,
        kind: OperationKind,
    ) -> AuditResult<Option<RevisionId>> {
        let Some(descriptor) = self.audited_descriptor(entity.type_name())? else {
            return Ok(None);
        };

        let data = self.entity_data(uow, entity, &descriptor)?;

        let writer = RevisionWriter::new(
            &self.config,
            &*self.metadata,
            &self.statements,
            &*self.clock,
        );
        writer
            .write(tx, conn, uow, &descriptor, &data, kind)
            .map(Some)
    }
}
