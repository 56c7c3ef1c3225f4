//! Flush simulation.
//!
//! [`FlushHarness`] plays the host: it owns a unit of work and a connection,
//! writes primary rows, and fires the audit hooks in the order an ORM fires
//! them during a flush:
//!
//! 1. `on_flush`, with the deletions already scheduled
//! 2. for every insert: the primary insert, then `post_persist`
//! 3. for every update: `pre_update`, the update itself, then `post_update`
//!
//! The whole flush runs inside one connection transaction. Any hook error
//! rolls the connection back, so audit rows and primary rows share one fate.

use crate::fixtures;
use crate::uow::MemoryUnitOfWork;
use entaudit_core::{
    AuditConfig, AuditError, AuditListener, AuditResult, AuditStats, AuditTransaction,
    ChangeRecord, EntityRef, FixedClock, HostEvent, Identifier, MetadataSource, RevisionId,
    TransactionId,
};
use entaudit_driver::{Connection, MemoryConnection};
use std::sync::Arc;
use tracing::debug;

/// Work of one flush.
#[derive(Debug, Clone, Default)]
pub struct Flush {
    inserts: Vec<EntityRef>,
    updates: Vec<(EntityRef, ChangeRecord)>,
    deletes: Vec<EntityRef>,
}

impl Flush {
    /// Creates an empty flush.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a managed instance.
    #[must_use]
    pub fn insert(mut self, entity: &EntityRef) -> Self {
        self.inserts.push(entity.clone());
        self
    }

    /// Updates a managed instance with `changes`.
    #[must_use]
    pub fn update(mut self, entity: &EntityRef, changes: ChangeRecord) -> Self {
        self.updates.push((entity.clone(), changes));
        self
    }

    /// Deletes a managed instance.
    #[must_use]
    pub fn delete(mut self, entity: &EntityRef) -> Self {
        self.deletes.push(entity.clone());
        self
    }

    /// Whether the flush does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Result of a committed flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Audit transaction the flush ran in.
    pub txid: TransactionId,
    /// Revision shared by every row of the flush, if anything was audited.
    pub revision: Option<RevisionId>,
    /// Rows written.
    pub stats: AuditStats,
}

/// A simulated host.
pub struct FlushHarness {
    listener: AuditListener,
    metadata: Arc<dyn MetadataSource>,
    uow: MemoryUnitOfWork,
    conn: MemoryConnection,
}

impl FlushHarness {
    /// Creates a harness; revisions are stamped with [`fixtures::epoch`].
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        config: AuditConfig,
        conn: MemoryConnection,
    ) -> Self {
        let listener = AuditListener::new(config, Arc::clone(&metadata))
            .with_clock(Arc::new(FixedClock::new(fixtures::epoch())));
        Self {
            listener,
            metadata,
            uow: MemoryUnitOfWork::new(),
            conn,
        }
    }

    /// Creates a harness over the billing schema on SQLite.
    pub fn billing() -> Self {
        Self::with_config(AuditConfig::default())
    }

    /// Creates a harness over the billing schema on SQLite with `config`.
    pub fn with_config(config: AuditConfig) -> Self {
        Self::new(
            Arc::new(fixtures::billing_registry()),
            config,
            MemoryConnection::new(),
        )
    }

    /// Returns the listener.
    #[must_use]
    pub fn listener(&self) -> &AuditListener {
        &self.listener
    }

    /// Returns the unit of work.
    #[must_use]
    pub fn uow(&self) -> &MemoryUnitOfWork {
        &self.uow
    }

    /// Returns the unit of work for setting up instances.
    pub fn uow_mut(&mut self) -> &mut MemoryUnitOfWork {
        &mut self.uow
    }

    /// Returns the connection.
    #[must_use]
    pub fn conn(&self) -> &MemoryConnection {
        &self.conn
    }

    /// Returns the connection for injecting failures.
    pub fn conn_mut(&mut self) -> &mut MemoryConnection {
        &mut self.conn
    }

    /// Runs one flush and commits it.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a primary write or an audit hook,
    /// after rolling the connection back.
    pub fn flush(&mut self, flush: Flush) -> AuditResult<FlushOutcome> {
        self.conn.begin();
        let mut tx = self.listener.begin_transaction();

        match self.run(&mut tx, flush) {
            Ok(()) => {
                self.conn.commit();
                self.uow.clear_deletions();
                let stats = tx.commit()?;
                debug!(txid = %tx.id(), rows = stats.rows_written(), "flush committed");
                Ok(FlushOutcome {
                    txid: tx.id(),
                    revision: tx.revision_id(),
                    stats,
                })
            }
            Err(err) => {
                self.conn.rollback();
                self.uow.cancel_deletions();
                tx.rollback()?;
                debug!(txid = %tx.id(), error = %err, "flush rolled back");
                Err(err)
            }
        }
    }

    fn run(&mut self, tx: &mut AuditTransaction, flush: Flush) -> AuditResult<()> {
        for entity in flush.deletes {
            self.uow.schedule_deletion(entity);
        }
        self.listener
            .dispatch(tx, &mut self.conn, &self.uow, HostEvent::OnFlush)?;

        for entity in &flush.inserts {
            self.persist(entity)?;
            self.listener
                .dispatch(tx, &mut self.conn, &self.uow, HostEvent::PostPersist { entity })?;
        }

        for (entity, changes) in flush.updates {
            self.uow.apply_changes(&entity, &changes);
            self.listener.dispatch(
                tx,
                &mut self.conn,
                &self.uow,
                HostEvent::PreUpdate {
                    entity: &entity,
                    changes,
                },
            )?;
            self.listener.dispatch(
                tx,
                &mut self.conn,
                &self.uow,
                HostEvent::PostUpdate { entity: &entity },
            )?;
        }
        Ok(())
    }

    /// Writes the primary row of `entity` (scalar fields only) and assigns a
    /// generated identifier to single-key types that lack one.
    fn persist(&mut self, entity: &EntityRef) -> AuditResult<()> {
        let descriptor = self
            .metadata
            .descriptor(entity.type_name())
            .ok_or_else(|| AuditError::unknown_entity_type(entity.type_name()))?;
        let data = self
            .uow
            .data(entity)
            .cloned()
            .ok_or_else(|| AuditError::unmanaged_entity(entity.to_string()))?;

        let platform = self.conn.platform();
        let mut columns = Vec::new();
        let mut params = Vec::new();
        let mut types = Vec::new();
        for field in &descriptor.fields {
            if let Some(value) = data.value(&field.name).filter(|v| !v.is_null()) {
                columns.push(field.quoted_column(platform));
                params.push(value.clone());
                types.push(field.column_type.clone());
            }
        }
        if columns.is_empty() {
            return Err(AuditError::invalid_operation(format!(
                "{entity} has nothing to insert"
            )));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            descriptor.table,
            columns.join(", "),
            placeholders
        );
        self.conn.execute(&sql, &params, &types)?;

        if data.identifier_for(&descriptor).is_err() {
            if let [id_field] = descriptor.identifier.as_slice() {
                let sequence = platform
                    .requires_sequence_for_insert_id()
                    .then(|| format!("{}_id_seq", descriptor.table));
                let id = self.conn.last_insert_id(sequence.as_deref())?;
                self.uow
                    .assign_identifier(entity, Identifier::single(id_field.clone(), id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{customer_data, CUSTOMER};

    #[test]
    fn flush_builder_tracks_work() {
        let mut host = FlushHarness::billing();
        let customer = host.uow_mut().manage(CUSTOMER, customer_data("Ada"));

        assert!(Flush::new().is_empty());
        assert!(!Flush::new().insert(&customer).is_empty());
        assert!(!Flush::new().delete(&customer).is_empty());
    }

    #[test]
    fn empty_flush_commits_without_a_revision() {
        let mut host = FlushHarness::billing();
        let outcome = host.flush(Flush::new()).unwrap();

        assert_eq!(outcome.revision, None);
        assert_eq!(outcome.stats.rows_written(), 0);
        assert_eq!(host.conn().row_count("revisions"), 0);
    }
}
