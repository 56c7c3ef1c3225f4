//! Core type definitions for the audit engine.

use chrono::NaiveDateTime;
use std::fmt;

/// Identifier of a revision ledger row.
///
/// Allocated by the database when the ledger row is inserted; shared by every
/// shadow row written in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionId(pub i64);

impl RevisionId {
    /// Creates a new revision ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev:{}", self.0)
    }
}

/// Handle of one audit context, as handed out by
/// [`AuditListener::begin_transaction`](crate::AuditListener::begin_transaction).
///
/// Unique only among the contexts of the listener that issued it; every
/// listener counts from `txn:1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Wraps a counter value.
    #[must_use]
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Position of this context in its listener's issue order.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Kind of operation a shadow row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Entity was inserted.
    Insert,
    /// Entity was updated.
    Update,
    /// Entity was deleted.
    Delete,
}

impl OperationKind {
    /// Returns the tag stored in the revision type column.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            OperationKind::Insert => "INS",
            OperationKind::Update => "UPD",
            OperationKind::Delete => "DEL",
        }
    }

    /// Parses a stored tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "INS" => Some(OperationKind::Insert),
            "UPD" => Some(OperationKind::Update),
            "DEL" => Some(OperationKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A revision ledger row.
///
/// Created once per logical transaction and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Generated ledger id.
    pub id: RevisionId,
    /// When the revision was opened.
    pub timestamp: NaiveDateTime,
    /// Author identity, if one was provided.
    pub username: Option<String>,
    /// Free-text description, if one was provided.
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_tags_roundtrip() {
        for kind in [
            OperationKind::Insert,
            OperationKind::Update,
            OperationKind::Delete,
        ] {
            assert_eq!(OperationKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(OperationKind::from_tag("INSERT"), None);
    }

    #[test]
    fn revision_id_display() {
        assert_eq!(RevisionId::new(7).to_string(), "rev:7");
        assert_eq!(TransactionId::new(3).to_string(), "txn:3");
    }
}
