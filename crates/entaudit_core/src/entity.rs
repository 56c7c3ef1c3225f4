//! Managed entity instances as seen through the host unit of work.

use crate::error::{AuditError, AuditResult};
use crate::metadata::EntityTypeDescriptor;
use entaudit_driver::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Handle to an instance managed by the host unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    type_name: String,
    handle: u64,
}

impl EntityRef {
    /// Creates a reference to an instance of `type_name`.
    pub fn new(type_name: impl Into<String>, handle: u64) -> Self {
        Self {
            type_name: type_name.into(),
            handle,
        }
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the host's opaque handle.
    #[must_use]
    pub const fn handle(&self) -> u64 {
        self.handle
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.handle)
    }
}

/// Identifier values of one instance, in identifier field order.
///
/// Single-field and composite identifiers share this representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identifier(Vec<(String, Value)>);

impl Identifier {
    /// Creates an empty identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-field identifier.
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(field, value)
    }

    /// Appends an identifier component.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((field.into(), value.into()));
        self
    }

    /// Returns the value of one identifier field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Iterates over `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the identifier has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

/// Field and association state of one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityData {
    values: BTreeMap<String, Value>,
    associations: BTreeMap<String, Option<EntityRef>>,
}

impl EntityData {
    /// Creates empty entity data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar value, builder style.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(field, value);
        self
    }

    /// Sets an association, builder style. `None` means no related instance.
    #[must_use]
    pub fn with_association(
        mut self,
        field: impl Into<String>,
        related: Option<EntityRef>,
    ) -> Self {
        self.associations.insert(field.into(), related);
        self
    }

    /// Sets a scalar value.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    /// Returns a scalar value.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns the related instance of an association, if any.
    #[must_use]
    pub fn association(&self, field: &str) -> Option<&EntityRef> {
        self.associations.get(field).and_then(Option::as_ref)
    }

    /// Overwrites identifier fields with `identifier`'s values.
    pub fn merge_identifier(&mut self, identifier: &Identifier) {
        for (field, value) in identifier.iter() {
            self.values.insert(field.to_string(), value.clone());
        }
    }

    /// Extracts this instance's identifier.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` if an identifier field is absent or null.
    pub fn identifier_for(&self, descriptor: &EntityTypeDescriptor) -> AuditResult<Identifier> {
        if descriptor.identifier.is_empty() {
            return Err(AuditError::missing_identifier(&descriptor.name, "<none declared>"));
        }
        descriptor
            .identifier
            .iter()
            .try_fold(Identifier::new(), |id, field| match self.values.get(field) {
                Some(value) if !value.is_null() => Ok(id.with(field.clone(), value.clone())),
                _ => Err(AuditError::missing_identifier(&descriptor.name, field)),
            })
    }
}

/// Resolves the identifier of a managed instance.
pub trait IdentifierResolver {
    /// Returns the identifier, or `None` if it is not known yet.
    fn identifier(&self, entity: &EntityRef) -> Option<Identifier>;
}

/// The host unit of work.
pub trait UnitOfWork: IdentifierResolver {
    /// Returns the instance's last known persisted state.
    fn original_data(&self, entity: &EntityRef) -> Option<EntityData>;

    /// Reads a field straight from the live in-memory instance.
    fn live_value(&self, entity: &EntityRef, field: &str) -> Option<Value>;

    /// Returns the instances scheduled for deletion in the current flush.
    fn scheduled_deletions(&self) -> Vec<EntityRef>;
}
