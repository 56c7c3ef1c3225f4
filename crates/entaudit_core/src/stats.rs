//! Per-transaction audit statistics.

use crate::types::OperationKind;

/// Counters of what one transaction wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    /// Shadow rows tagged `INS`.
    pub inserts: u64,
    /// Shadow rows tagged `UPD`.
    pub updates: u64,
    /// Shadow rows tagged `DEL`.
    pub deletes: u64,
    /// Ledger rows inserted (zero or one).
    pub revisions: u64,
}

impl AuditStats {
    /// Records one shadow row.
    pub(crate) fn record(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::Insert => self.inserts += 1,
            OperationKind::Update => self.updates += 1,
            OperationKind::Delete => self.deletes += 1,
        }
    }

    /// Records a ledger insert.
    pub(crate) fn record_revision(&mut self) {
        self.revisions += 1;
    }

    /// Returns the total number of shadow rows.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.inserts + self.updates + self.deletes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_kind() {
        let mut stats = AuditStats::default();
        stats.record(OperationKind::Insert);
        stats.record(OperationKind::Insert);
        stats.record(OperationKind::Delete);
        stats.record_revision();

        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.updates, 0);
        assert_eq!(stats.rows_written(), 3);
        assert_eq!(stats.revisions, 1);
    }
}
