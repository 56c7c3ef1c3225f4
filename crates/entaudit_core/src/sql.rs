//! Shadow table insert statements.
//!
//! Statements are derived from entity metadata alone, so they are built once
//! per (platform, entity type) and shared through a [`StatementCache`].

use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::metadata::EntityTypeDescriptor;
use entaudit_driver::Platform;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// What a statement parameter is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSlot {
    /// The transaction's revision id.
    Revision,
    /// The operation tag.
    OperationKind,
    /// The encoded diff.
    Diff,
    /// A scalar field of the entity.
    Field {
        /// Field name.
        field: String,
    },
    /// One join column of an owning to-one association.
    JoinColumn {
        /// Association field name.
        association: String,
        /// Column in the shadow table.
        source: String,
        /// Referenced column of the target type.
        target: String,
    },
}

/// A parameterized insert into one shadow table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    sql: String,
    columns: Vec<String>,
    slots: Vec<ParamSlot>,
}

impl InsertStatement {
    /// Returns the shadow table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the column list as written in the statement.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the parameter slots in placeholder order.
    #[must_use]
    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }
}

/// Builds the shadow table insert for one entity type.
///
/// Column order is fixed: revision, operation tag and diff, then scalar
/// fields in declaration order, then the join columns of owning to-one
/// associations.
#[must_use]
pub fn build_insert_statement(
    descriptor: &EntityTypeDescriptor,
    config: &AuditConfig,
    platform: Platform,
) -> InsertStatement {
    let table = config.shadow_table_name(&descriptor.table);

    let mut columns = vec![
        config.revision_field_name.clone(),
        config.revision_type_field_name.clone(),
        config.revision_diff_field_name.clone(),
    ];
    let mut placeholders = vec!["?".to_string(); 3];
    let mut slots = vec![ParamSlot::Revision, ParamSlot::OperationKind, ParamSlot::Diff];

    for field in &descriptor.fields {
        columns.push(field.quoted_column(platform));
        placeholders.push(if field.requires_sql_conversion {
            field
                .column_type
                .convert_to_database_value_sql("?", platform)
        } else {
            "?".to_string()
        });
        slots.push(ParamSlot::Field {
            field: field.name.clone(),
        });
    }

    for association in descriptor.persisted_associations() {
        for join in &association.join_columns {
            columns.push(join.source.clone());
            placeholders.push("?".to_string());
            slots.push(ParamSlot::JoinColumn {
                association: association.field.clone(),
                source: join.source.clone(),
                target: join.target.clone(),
            });
        }
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    InsertStatement {
        table,
        sql,
        columns,
        slots,
    }
}

/// Process-wide memo of insert statements by platform and entity type.
///
/// Entries are never invalidated. Two threads missing on the same key both
/// build; the statements are identical, so whichever is stored last wins.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<Platform, HashMap<String, Arc<InsertStatement>>>>,
}

impl StatementCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached statement.
    #[must_use]
    pub fn get(&self, platform: Platform, type_name: &str) -> Option<Arc<InsertStatement>> {
        self.entries
            .read()
            .get(&platform)
            .and_then(|by_type| by_type.get(type_name))
            .cloned()
    }

    /// Returns the statement for `descriptor`, building it on a miss.
    pub fn get_or_build(
        &self,
        descriptor: &EntityTypeDescriptor,
        config: &AuditConfig,
        platform: Platform,
    ) -> Arc<InsertStatement> {
        if let Some(stmt) = self.get(platform, &descriptor.name) {
            trace!(type_name = %descriptor.name, %platform, "statement cache hit");
            return stmt;
        }
        self.store(
            platform,
            &descriptor.name,
            build_insert_statement(descriptor, config, platform),
        )
    }

    /// Returns the statement for `type_name`, calling `loader` for its
    /// metadata only on a miss.
    ///
    /// # Errors
    ///
    /// Returns whatever `loader` fails with.
    pub fn get_or_build_with<F>(
        &self,
        platform: Platform,
        type_name: &str,
        config: &AuditConfig,
        loader: F,
    ) -> AuditResult<Arc<InsertStatement>>
    where
        F: FnOnce() -> AuditResult<Arc<EntityTypeDescriptor>>,
    {
        if let Some(stmt) = self.get(platform, type_name) {
            trace!(type_name, %platform, "statement cache hit");
            return Ok(stmt);
        }
        let descriptor = loader()?;
        Ok(self.store(
            platform,
            type_name,
            build_insert_statement(&descriptor, config, platform),
        ))
    }

    /// Returns the number of cached statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached statement.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn store(
        &self,
        platform: Platform,
        type_name: &str,
        stmt: InsertStatement,
    ) -> Arc<InsertStatement> {
        trace!(type_name, %platform, table = %stmt.table, "built insert statement");
        let stmt = Arc::new(stmt);
        self.entries
            .write()
            .entry(platform)
            .or_default()
            .insert(type_name.to_string(), Arc::clone(&stmt));
        stmt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::metadata::{AssociationDescriptor, FieldDescriptor};
    use entaudit_driver::ColumnType;
    use std::cell::Cell;

    fn invoice() -> EntityTypeDescriptor {
        EntityTypeDescriptor::new("Invoice", "invoice")
            .with_identifier(&["id"])
            .with_field(FieldDescriptor::new("id", ColumnType::Integer))
            .with_field(FieldDescriptor::new("amount", ColumnType::Integer))
            .with_field(FieldDescriptor::new("order", ColumnType::Integer).quoted())
            .with_field(
                FieldDescriptor::new("payload", ColumnType::Json).requires_sql_conversion(),
            )
            .with_association(
                AssociationDescriptor::many_to_one("customer", "Customer")
                    .join_column("customer_id", "id"),
            )
            .with_association(AssociationDescriptor::one_to_many("lines", "LineItem"))
            .with_association(AssociationDescriptor::one_to_one("note", "Note", false))
    }

    #[test]
    fn builds_columns_in_fixed_order() {
        let stmt = build_insert_statement(&invoice(), &AuditConfig::default(), Platform::Postgres);

        assert_eq!(stmt.table(), "invoice_audit");
        assert_eq!(
            stmt.sql(),
            "INSERT INTO invoice_audit (rev, revtype, diff, id, amount, \"order\", payload, \
             customer_id) VALUES (?, ?, ?, ?, ?, ?, CAST(? AS JSONB), ?)"
        );
        assert_eq!(stmt.columns().len(), stmt.slots().len());
        assert_eq!(
            stmt.slots().last(),
            Some(&ParamSlot::JoinColumn {
                association: "customer".into(),
                source: "customer_id".into(),
                target: "id".into(),
            })
        );
    }

    #[test]
    fn mysql_quoting_and_custom_names() {
        let config = AuditConfig::new()
            .table_prefix("h_")
            .table_suffix("")
            .revision_field_name("r")
            .revision_type_field_name("t")
            .revision_diff_field_name("d");
        let stmt = build_insert_statement(&invoice(), &config, Platform::MySql);

        assert_eq!(stmt.table(), "h_invoice");
        assert!(stmt.sql().starts_with("INSERT INTO h_invoice (r, t, d, id, amount, `order`"));
        assert!(stmt.sql().contains("CAST(? AS JSON)"));
    }

    #[test]
    fn composite_join_columns_each_get_a_slot() {
        let desc = EntityTypeDescriptor::new("Shipment", "shipment")
            .with_identifier(&["id"])
            .with_field(FieldDescriptor::new("id", ColumnType::Integer))
            .with_association(
                AssociationDescriptor::many_to_one("line", "LineItem")
                    .join_column("line_invoice_id", "invoice_id")
                    .join_column("line_no", "line_no"),
            );
        let stmt = build_insert_statement(&desc, &AuditConfig::default(), Platform::Sqlite);

        assert_eq!(
            stmt.columns(),
            &["rev", "revtype", "diff", "id", "line_invoice_id", "line_no"]
        );
    }

    #[test]
    fn cache_hits_skip_the_loader() {
        let cache = StatementCache::new();
        let config = AuditConfig::default();
        let loads = Cell::new(0);
        let loader = || {
            loads.set(loads.get() + 1);
            Ok(Arc::new(invoice()))
        };

        let first = cache
            .get_or_build_with(Platform::Sqlite, "Invoice", &config, loader)
            .unwrap();
        let second = cache
            .get_or_build_with(Platform::Sqlite, "Invoice", &config, loader)
            .unwrap();

        assert_eq!(loads.get(), 1);
        assert_eq!(first.sql(), second.sql());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_is_keyed_by_platform() {
        let cache = StatementCache::new();
        let config = AuditConfig::default();
        let sqlite = cache.get_or_build(&invoice(), &config, Platform::Sqlite);
        let pg = cache.get_or_build(&invoice(), &config, Platform::Postgres);

        assert_eq!(cache.len(), 2);
        assert_ne!(sqlite.sql(), pg.sql());
        assert!(cache.get(Platform::MySql, "Invoice").is_none());
        assert!(cache.get(Platform::Sqlite, "Invoice").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn loader_failure_caches_nothing() {
        let cache = StatementCache::new();
        let result = cache.get_or_build_with(
            Platform::Sqlite,
            "Ghost",
            &AuditConfig::default(),
            || Err(AuditError::unknown_entity_type("Ghost")),
        );

        assert!(matches!(result, Err(AuditError::UnknownEntityType { .. })));
        assert!(cache.is_empty());
    }
}
