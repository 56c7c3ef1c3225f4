//! Entity type metadata.
//!
//! Descriptors are supplied by the host (usually its ORM mapping layer) and
//! are read-only to the engine. A type's shadow table mirrors its descriptor:
//! one column per scalar field and one column per join column of every owning
//! to-one association.

use entaudit_driver::{ColumnType, Platform};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A scalar field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Column name in the entity table (and its shadow table).
    pub column: String,
    /// Logical column type.
    pub column_type: ColumnType,
    /// Whether the column name must be quoted.
    pub quoted: bool,
    /// Whether bound values need database-side conversion SQL.
    pub requires_sql_conversion: bool,
}

impl FieldDescriptor {
    /// Creates a field whose column is named after it.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            column_type,
            quoted: false,
            requires_sql_conversion: false,
        }
    }

    /// Sets the column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks the column name as needing quotes.
    #[must_use]
    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    /// Marks bound values as needing conversion SQL.
    #[must_use]
    pub fn requires_sql_conversion(mut self) -> Self {
        self.requires_sql_conversion = true;
        self
    }

    /// Returns the column name as it must appear in SQL on `platform`.
    #[must_use]
    pub fn quoted_column(&self, platform: Platform) -> String {
        if self.quoted {
            platform.quote_identifier(&self.column)
        } else {
            self.column.clone()
        }
    }
}

/// Cardinality of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// One-to-one.
    OneToOne,
    /// Many-to-one.
    ManyToOne,
    /// One-to-many.
    OneToMany,
    /// Many-to-many.
    ManyToMany,
}

impl AssociationKind {
    /// Whether the association points at a single instance.
    #[must_use]
    pub const fn is_to_one(self) -> bool {
        matches!(self, AssociationKind::OneToOne | AssociationKind::ManyToOne)
    }
}

/// A foreign-key column pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumn {
    /// Column in the owning table.
    pub source: String,
    /// Referenced column in the target table.
    pub target: String,
}

/// An association from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    /// Association field name.
    pub field: String,
    /// Cardinality.
    pub kind: AssociationKind,
    /// Whether this side's table holds the foreign-key columns.
    pub owning_side: bool,
    /// Related entity type.
    pub target_type: String,
    /// Foreign-key columns, one per target key column.
    pub join_columns: Vec<JoinColumn>,
}

impl AssociationDescriptor {
    /// Creates an owning many-to-one association.
    pub fn many_to_one(field: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(field, AssociationKind::ManyToOne, true, target_type)
    }

    /// Creates a one-to-one association.
    pub fn one_to_one(
        field: impl Into<String>,
        target_type: impl Into<String>,
        owning_side: bool,
    ) -> Self {
        Self::new(field, AssociationKind::OneToOne, owning_side, target_type)
    }

    /// Creates an inverse one-to-many association.
    pub fn one_to_many(field: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(field, AssociationKind::OneToMany, false, target_type)
    }

    fn new(
        field: impl Into<String>,
        kind: AssociationKind,
        owning_side: bool,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            owning_side,
            target_type: target_type.into(),
            join_columns: Vec::new(),
        }
    }

    /// Adds a `source -> target` join column.
    #[must_use]
    pub fn join_column(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.join_columns.push(JoinColumn {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    /// Whether this association's columns are part of the shadow row.
    ///
    /// Only owning to-one associations hold foreign keys; the inverse side is
    /// derivable from them.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.kind.is_to_one() && self.owning_side
    }
}

/// Metadata of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeDescriptor {
    /// Type name.
    pub name: String,
    /// Base table name.
    pub table: String,
    /// Identifier field names.
    pub identifier: Vec<String>,
    /// Optimistic-concurrency version field, if the type is versioned.
    pub version_field: Option<String>,
    /// Scalar fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Associations in declaration order.
    pub associations: Vec<AssociationDescriptor>,
}

impl EntityTypeDescriptor {
    /// Creates a descriptor with no fields.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifier: Vec::new(),
            version_field: None,
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Sets the identifier fields.
    #[must_use]
    pub fn with_identifier(mut self, fields: &[&str]) -> Self {
        self.identifier = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Appends a scalar field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends an association.
    #[must_use]
    pub fn with_association(mut self, association: AssociationDescriptor) -> Self {
        self.associations.push(association);
        self
    }

    /// Declares the version field.
    #[must_use]
    pub fn with_version_field(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    /// Whether the type uses optimistic concurrency.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.version_field.is_some()
    }

    /// Looks up a scalar field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up the scalar field mapped to `column`.
    #[must_use]
    pub fn field_for_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Looks up an association by field name.
    #[must_use]
    pub fn association(&self, field: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.field == field)
    }

    /// Returns the associations whose join columns are stored.
    pub fn persisted_associations(&self) -> impl Iterator<Item = &AssociationDescriptor> {
        self.associations.iter().filter(|a| a.is_persisted())
    }
}

/// Provides entity metadata to the engine.
pub trait MetadataSource: Send + Sync {
    /// Returns the descriptor of a type, if known.
    fn descriptor(&self, type_name: &str) -> Option<Arc<EntityTypeDescriptor>>;

    /// Whether the type is under audit.
    fn is_audited(&self, type_name: &str) -> bool;
}

/// A metadata source populated up front.
///
/// Types can be registered without being audited so that they are still
/// available as association targets.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    descriptors: HashMap<String, Arc<EntityTypeDescriptor>>,
    audited: HashSet<String>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type without auditing it.
    pub fn register(&mut self, descriptor: EntityTypeDescriptor) -> &mut Self {
        self.descriptors
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        self
    }

    /// Registers a type and puts it under audit.
    pub fn audit(&mut self, descriptor: EntityTypeDescriptor) -> &mut Self {
        self.audited.insert(descriptor.name.clone());
        self.register(descriptor)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl MetadataSource for MetadataRegistry {
    fn descriptor(&self, type_name: &str) -> Option<Arc<EntityTypeDescriptor>> {
        self.descriptors.get(type_name).cloned()
    }

    fn is_audited(&self, type_name: &str) -> bool {
        self.audited.contains(type_name)
    }
}
