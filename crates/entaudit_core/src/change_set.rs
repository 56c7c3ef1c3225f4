//! Per-transaction change-set tracking.
//!
//! Field-level changes are only visible to the host before an update is
//! written, while the final values (generated ids, defaults) only exist
//! afterwards. The index carries the former across to the latter.

use crate::entity::Identifier;
use entaudit_driver::Value;
use std::collections::{BTreeMap, HashMap};

/// Old/new value pairs of the fields that changed on one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeRecord {
    changes: BTreeMap<String, (Value, Value)>,
}

impl ChangeRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a change, builder style.
    #[must_use]
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Self {
        self.insert(field, old, new);
        self
    }

    /// Records a change, replacing any earlier change of the same field.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) {
        self.changes.insert(field.into(), (old.into(), new.into()));
    }

    /// Returns the change of one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&(Value, Value)> {
        self.changes.get(field)
    }

    /// Iterates over changes in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value, &Value)> {
        self.changes
            .iter()
            .map(|(field, (old, new))| (field.as_str(), old, new))
    }

    /// Returns the number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<(String, (Value, Value))> for ChangeRecord {
    fn from_iter<I: IntoIterator<Item = (String, (Value, Value))>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Change records of one transaction, keyed by (type name, identifier).
#[derive(Debug, Default)]
pub struct ChangeSetIndex {
    records: HashMap<String, HashMap<Identifier, ChangeRecord>>,
}

impl ChangeSetIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the change record of an instance.
    ///
    /// A later record for the same instance replaces the earlier one.
    pub fn record(&mut self, type_name: &str, identifier: Identifier, record: ChangeRecord) {
        self.records
            .entry(type_name.to_string())
            .or_default()
            .insert(identifier, record);
    }

    /// Returns the change record of an instance, if one was stored.
    #[must_use]
    pub fn lookup(&self, type_name: &str, identifier: &Identifier) -> Option<&ChangeRecord> {
        self.records.get(type_name)?.get(identifier)
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount_change() -> ChangeRecord {
        ChangeRecord::new().with_change("amount", 100i64, 150i64)
    }

    #[test]
    fn lookup_finds_recorded_instance() {
        let mut index = ChangeSetIndex::new();
        index.record("Invoice", Identifier::single("id", 42i64), amount_change());

        let found = index.lookup("Invoice", &Identifier::single("id", 42i64));
        assert_eq!(found, Some(&amount_change()));
    }

    #[test]
    fn lookup_is_keyed_by_type_and_identifier() {
        let mut index = ChangeSetIndex::new();
        index.record("Invoice", Identifier::single("id", 42i64), amount_change());

        assert!(index.lookup("Invoice", &Identifier::single("id", 43i64)).is_none());
        assert!(index.lookup("Customer", &Identifier::single("id", 42i64)).is_none());
        // Same printed value, different type.
        assert!(index.lookup("Invoice", &Identifier::single("id", "42")).is_none());
    }

    #[test]
    fn never_recorded_instance_is_absent() {
        let index = ChangeSetIndex::new();
        assert!(index.is_empty());
        assert!(index.lookup("Invoice", &Identifier::single("id", 1i64)).is_none());
    }

    #[test]
    fn later_record_replaces_earlier() {
        let mut index = ChangeSetIndex::new();
        let id = Identifier::single("id", 1i64);
        index.record("Invoice", id.clone(), amount_change());
        index.record(
            "Invoice",
            id.clone(),
            ChangeRecord::new().with_change("status", "draft", "sent"),
        );

        assert_eq!(index.len(), 1);
        let record = index.lookup("Invoice", &id).unwrap();
        assert!(record.get("amount").is_none());
        assert!(record.get("status").is_some());
    }

    #[test]
    fn composite_identifiers_are_distinct() {
        let mut index = ChangeSetIndex::new();
        let a = Identifier::single("invoiceId", 1i64).with("lineNo", 1i64);
        let b = Identifier::single("invoiceId", 1i64).with("lineNo", 2i64);
        index.record("LineItem", a.clone(), amount_change());

        assert!(index.lookup("LineItem", &a).is_some());
        assert!(index.lookup("LineItem", &b).is_none());
    }
}
