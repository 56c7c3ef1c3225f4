//! Per-transaction audit context.
//!
//! One [`AuditTransaction`] accompanies one host transaction. It carries the
//! state that must survive from the pre-commit hooks to the post-commit
//! hooks: the change sets recorded by `pre_update` and the lazily allocated
//! revision. It is never shared, so it needs no locking.

use crate::change_set::ChangeSetIndex;
use crate::error::{AuditError, AuditResult};
use crate::revision::RevisionSequencer;
use crate::stats::AuditStats;
use crate::types::{Revision, RevisionId, TransactionId};

/// State of an audit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Hooks may still run.
    Active,
    /// The host transaction committed.
    Committed,
    /// The host transaction rolled back.
    RolledBack,
}

/// Audit state of one host transaction.
#[derive(Debug)]
pub struct AuditTransaction {
    id: TransactionId,
    state: TransactionState,
    pub(crate) sequencer: RevisionSequencer,
    pub(crate) change_sets: ChangeSetIndex,
    pub(crate) stats: AuditStats,
}

impl AuditTransaction {
    /// Creates an active transaction context.
    #[must_use]
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            sequencer: RevisionSequencer::new(),
            change_sets: ChangeSetIndex::new(),
            stats: AuditStats::default(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the revision id, if one was allocated.
    #[must_use]
    pub fn revision_id(&self) -> Option<RevisionId> {
        self.sequencer.current_id()
    }

    /// Returns the allocated revision, if any.
    #[must_use]
    pub fn revision(&self) -> Option<&Revision> {
        self.sequencer.revision()
    }

    /// Returns the change sets recorded so far.
    #[must_use]
    pub fn change_sets(&self) -> &ChangeSetIndex {
        &self.change_sets
    }

    /// Returns what this transaction has written.
    #[must_use]
    pub fn stats(&self) -> AuditStats {
        self.stats
    }

    /// Marks the transaction committed and returns its final statistics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the transaction already finished.
    pub fn commit(&mut self) -> AuditResult<AuditStats> {
        self.ensure_active()?;
        self.state = TransactionState::Committed;
        Ok(self.stats)
    }

    /// Marks the transaction rolled back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the transaction already finished.
    pub fn rollback(&mut self) -> AuditResult<()> {
        self.ensure_active()?;
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> AuditResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(AuditError::invalid_operation(format!(
                "{} already committed",
                self.id
            ))),
            TransactionState::RolledBack => Err(AuditError::invalid_operation(format!(
                "{} already rolled back",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_transaction_has_no_revision() {
        let tx = AuditTransaction::new(TransactionId::new(1));
        assert!(tx.is_active());
        assert_eq!(tx.revision_id(), None);
        assert!(tx.change_sets().is_empty());
        assert_eq!(tx.stats().rows_written(), 0);
    }

    #[test]
    fn commit_finishes() {
        let mut tx = AuditTransaction::new(TransactionId::new(1));
        tx.commit().unwrap();
        assert_eq!(tx.state(), TransactionState::Committed);

        let err = tx.commit().unwrap_err();
        assert!(matches!(
            err,
            AuditError::InvalidOperation { ref message } if message.contains("txn:1")
        ));
        assert!(tx.rollback().is_err());
    }

    #[test]
    fn rollback_finishes() {
        let mut tx = AuditTransaction::new(TransactionId::new(2));
        tx.rollback().unwrap();
        assert_eq!(tx.state(), TransactionState::RolledBack);
        assert!(tx.ensure_active().is_err());
    }
}
