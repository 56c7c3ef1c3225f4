//! Shadow row writing.

use crate::clock::Clock;
use crate::config::AuditConfig;
use crate::diff::DiffEncoder;
use crate::entity::{EntityData, IdentifierResolver};
use crate::error::{AuditError, AuditResult};
use crate::metadata::{EntityTypeDescriptor, MetadataSource};
use crate::sql::{ParamSlot, StatementCache};
use crate::transaction::AuditTransaction;
use crate::types::{OperationKind, RevisionId};
use entaudit_driver::{ColumnType, Connection, Value};
use tracing::debug;

/// Writes one shadow row per call.
///
/// Borrowed from the listener for the duration of a hook; owns nothing.
#[derive(Clone, Copy)]
pub struct RevisionWriter<'a> {
    config: &'a AuditConfig,
    metadata: &'a dyn MetadataSource,
    statements: &'a StatementCache,
    clock: &'a dyn Clock,
}

impl<'a> RevisionWriter<'a> {
    /// Creates a writer over the listener's shared parts.
    #[must_use]
    pub fn new(
        config: &'a AuditConfig,
        metadata: &'a dyn MetadataSource,
        statements: &'a StatementCache,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            metadata,
            statements,
            clock,
        }
    }

    /// Writes the shadow row of one instance at the transaction's revision.
    ///
    /// `data` is the post-operation state, identifier included. Updates and
    /// deletes pick up the change set recorded for the instance; inserts
    /// always store a NULL diff.
    ///
    /// # Errors
    ///
    /// - `MissingIdentifier` if `data` lacks an identifier value
    /// - `UnresolvableAssociation` if a related instance has no identifier
    /// - `UnknownEntityType` / `UnknownJoinColumn` for inconsistent metadata
    /// - `Driver` if the ledger or shadow insert fails
    pub fn write<R>(
        &self,
        tx: &mut AuditTransaction,
        conn: &mut dyn Connection,
        resolver: &R,
        descriptor: &EntityTypeDescriptor,
        data: &EntityData,
        kind: OperationKind,
    ) -> AuditResult<RevisionId>
    where
        R: IdentifierResolver + ?Sized,
    {
        let identifier = data.identifier_for(descriptor)?;

        let record = match kind {
            OperationKind::Insert => None,
            OperationKind::Update | OperationKind::Delete => {
                tx.change_sets.lookup(&descriptor.name, &identifier)
            }
        };
        let diff = DiffEncoder::new(&self.config.datetime_format).encode(record);

        let opened = tx.sequencer.current_id().is_none();
        let revision = tx.sequencer.current(conn, self.config, self.clock)?;
        if opened {
            tx.stats.record_revision();
        }

        let platform = conn.platform();
        let statement = self.statements.get_or_build(descriptor, self.config, platform);

        let mut params = Vec::with_capacity(statement.slots().len());
        let mut types = Vec::with_capacity(statement.slots().len());
        for slot in statement.slots() {
            let (value, column_type) = match slot {
                ParamSlot::Revision => (Value::Integer(revision.as_i64()), ColumnType::Integer),
                ParamSlot::OperationKind => (Value::from(kind.tag()), ColumnType::String),
                ParamSlot::Diff => (Value::from(diff.clone()), ColumnType::Text),
                ParamSlot::Field { field } => (
                    data.value(field).cloned().unwrap_or(Value::Null),
                    descriptor
                        .field(field)
                        .map_or(ColumnType::String, |f| f.column_type.clone()),
                ),
                ParamSlot::JoinColumn {
                    association,
                    target,
                    ..
                } => self.join_value(resolver, descriptor, data, association, target)?,
            };
            params.push(value);
            types.push(column_type);
        }

        conn.execute(statement.sql(), &params, &types)?;
        tx.stats.record(kind);
        debug!(
            type_name = %descriptor.name,
            id = %identifier,
            kind = %kind,
            revision = %revision,
            table = statement.table(),
            "wrote shadow row"
        );
        Ok(revision)
    }

    /// Resolves one join column of an association to the related instance's
    /// key value.
    fn join_value<R>(
        &self,
        resolver: &R,
        descriptor: &EntityTypeDescriptor,
        data: &EntityData,
        association: &str,
        target_column: &str,
    ) -> AuditResult<(Value, ColumnType)>
    where
        R: IdentifierResolver + ?Sized,
    {
        let Some(related) = data.association(association) else {
            return Ok((Value::Null, ColumnType::String));
        };

        let target_type = descriptor
            .association(association)
            .map_or(related.type_name(), |a| a.target_type.as_str());
        let unresolvable = || AuditError::UnresolvableAssociation {
            type_name: descriptor.name.clone(),
            association: association.to_string(),
            target_type: target_type.to_string(),
        };

        let target = self
            .metadata
            .descriptor(target_type)
            .ok_or_else(|| AuditError::unknown_entity_type(target_type))?;
        let target_field =
            target
                .field_for_column(target_column)
                .ok_or_else(|| AuditError::UnknownJoinColumn {
                    target_type: target_type.to_string(),
                    column: target_column.to_string(),
                })?;

        let identifier = resolver.identifier(related).ok_or_else(unresolvable)?;
        let value = identifier
            .get(&target_field.name)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(unresolvable)?;
        Ok((value, target_field.column_type.clone()))
    }
}
