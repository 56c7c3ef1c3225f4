//! In-memory unit of work.

use entaudit_core::{
    ChangeRecord, EntityData, EntityRef, Identifier, IdentifierResolver, UnitOfWork,
};
use entaudit_driver::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Managed {
    identifier: Option<Identifier>,
    original: EntityData,
    live: HashMap<String, Value>,
}

/// A unit of work backed by plain maps.
///
/// Tests drive it the way an ORM would: instances are managed with their
/// state, receive generated identifiers after insert, and get their original
/// data replaced once an update is written.
#[derive(Debug, Default)]
pub struct MemoryUnitOfWork {
    next_handle: u64,
    entities: HashMap<EntityRef, Managed>,
    deletions: Vec<EntityRef>,
}

impl MemoryUnitOfWork {
    /// Creates an empty unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manages a new instance whose identifier is not known yet.
    pub fn manage(&mut self, type_name: &str, data: EntityData) -> EntityRef {
        self.next_handle += 1;
        let entity = EntityRef::new(type_name, self.next_handle);
        self.entities.insert(
            entity.clone(),
            Managed {
                original: data,
                ..Managed::default()
            },
        );
        entity
    }

    /// Manages an already persisted instance.
    pub fn manage_with_identifier(
        &mut self,
        type_name: &str,
        identifier: Identifier,
        data: EntityData,
    ) -> EntityRef {
        let entity = self.manage(type_name, data);
        self.assign_identifier(&entity, identifier);
        entity
    }

    /// Sets the identifier of a managed instance.
    pub fn assign_identifier(&mut self, entity: &EntityRef, identifier: Identifier) {
        if let Some(managed) = self.entities.get_mut(entity) {
            managed.identifier = Some(identifier);
        }
    }

    /// Returns the original data of a managed instance.
    #[must_use]
    pub fn data(&self, entity: &EntityRef) -> Option<&EntityData> {
        self.entities.get(entity).map(|m| &m.original)
    }

    /// Writes the new side of `changes` into the original data, as the host
    /// does once an update has been executed.
    pub fn apply_changes(&mut self, entity: &EntityRef, changes: &ChangeRecord) {
        if let Some(managed) = self.entities.get_mut(entity) {
            for (field, _, new) in changes.iter() {
                managed.original.set_value(field, new.clone());
            }
        }
    }

    /// Sets a field on the live instance only.
    pub fn set_live_value(&mut self, entity: &EntityRef, field: &str, value: impl Into<Value>) {
        if let Some(managed) = self.entities.get_mut(entity) {
            managed.live.insert(field.to_string(), value.into());
        }
    }

    /// Schedules an instance for deletion in the next flush.
    pub fn schedule_deletion(&mut self, entity: EntityRef) {
        if !self.deletions.contains(&entity) {
            self.deletions.push(entity);
        }
    }

    /// Detaches the instances deleted by the last flush.
    pub fn clear_deletions(&mut self) {
        for entity in self.deletions.drain(..) {
            self.entities.remove(&entity);
        }
    }

    /// Forgets scheduled deletions without detaching anything.
    pub fn cancel_deletions(&mut self) {
        self.deletions.clear();
    }
}

impl IdentifierResolver for MemoryUnitOfWork {
    fn identifier(&self, entity: &EntityRef) -> Option<Identifier> {
        self.entities.get(entity).and_then(|m| m.identifier.clone())
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    fn original_data(&self, entity: &EntityRef) -> Option<EntityData> {
        self.entities.get(entity).map(|m| m.original.clone())
    }

    fn live_value(&self, entity: &EntityRef, field: &str) -> Option<Value> {
        let managed = self.entities.get(entity)?;
        managed
            .live
            .get(field)
            .or_else(|| managed.original.value(field))
            .cloned()
    }

    fn scheduled_deletions(&self) -> Vec<EntityRef> {
        self.deletions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_arrive_after_insert() {
        let mut uow = MemoryUnitOfWork::new();
        let entity = uow.manage("Customer", EntityData::new().with_value("name", "Acme"));
        assert!(uow.identifier(&entity).is_none());

        uow.assign_identifier(&entity, Identifier::single("id", 1i64));
        assert_eq!(uow.identifier(&entity), Some(Identifier::single("id", 1i64)));
    }

    #[test]
    fn live_value_shadows_original() {
        let mut uow = MemoryUnitOfWork::new();
        let entity = uow.manage("Invoice", EntityData::new().with_value("version", 1i64));
        assert_eq!(uow.live_value(&entity, "version"), Some(Value::Integer(1)));

        uow.set_live_value(&entity, "version", 2i64);
        assert_eq!(uow.live_value(&entity, "version"), Some(Value::Integer(2)));
        assert_eq!(
            uow.original_data(&entity).unwrap().value("version"),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn deletions_are_detached_when_cleared() {
        let mut uow = MemoryUnitOfWork::new();
        let entity = uow.manage("Tag", EntityData::new());
        uow.schedule_deletion(entity.clone());
        uow.schedule_deletion(entity.clone());
        assert_eq!(uow.scheduled_deletions().len(), 1);

        uow.clear_deletions();
        assert!(uow.scheduled_deletions().is_empty());
        assert!(uow.original_data(&entity).is_none());
    }
}
