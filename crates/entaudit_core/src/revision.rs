//! Revision allocation.

use crate::clock::Clock;
use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::types::{Revision, RevisionId};
use entaudit_driver::{ColumnType, Connection, Value};
use tracing::debug;

/// Allocates the revision of one transaction.
///
/// The ledger row is inserted the first time an id is requested; every later
/// request in the same transaction returns the same id. A transaction that
/// never asks writes no ledger row at all.
#[derive(Debug, Default)]
pub struct RevisionSequencer {
    current: Option<Revision>,
}

impl RevisionSequencer {
    /// Creates a sequencer with no revision allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transaction's revision id, opening the revision on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger insert fails or the connection cannot
    /// report the generated id. Nothing is cached in that case.
    pub fn current(
        &mut self,
        conn: &mut dyn Connection,
        config: &AuditConfig,
        clock: &dyn Clock,
    ) -> AuditResult<RevisionId> {
        if let Some(revision) = &self.current {
            return Ok(revision.id);
        }

        let platform = conn.platform();
        let timestamp = config.locked_timestamp.unwrap_or_else(|| clock.now());
        let username = config.current_username();
        let description = config.current_description();

        let sql = format!(
            "INSERT INTO {} (timestamp, username, {}) VALUES (?, ?, ?)",
            config.revision_table_name, config.revision_description_field_name
        );
        conn.execute(
            &sql,
            &[
                Value::Text(timestamp.format(platform.datetime_format()).to_string()),
                Value::from(username.clone()),
                Value::from(description.clone()),
            ],
            &[ColumnType::DateTime, ColumnType::String, ColumnType::String],
        )?;

        let sequence = platform
            .requires_sequence_for_insert_id()
            .then(|| config.revision_id_sequence_name());
        let id = RevisionId::new(conn.last_insert_id(sequence.as_deref())?);
        debug!(revision = %id, %timestamp, "opened revision");

        self.current = Some(Revision {
            id,
            timestamp,
            username,
            description,
        });
        Ok(id)
    }

    /// Returns the allocated id, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<RevisionId> {
        self.current.as_ref().map(|r| r.id)
    }

    /// Returns the allocated revision, if any.
    #[must_use]
    pub fn revision(&self) -> Option<&Revision> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, NaiveDateTime};
    use entaudit_driver::{MemoryConnection, Platform};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn allocates_once() {
        let mut conn = MemoryConnection::new();
        let config = AuditConfig::new().username("alice");
        let clock = FixedClock::new(noon());
        let mut seq = RevisionSequencer::new();
        assert_eq!(seq.current_id(), None);

        let first = seq.current(&mut conn, &config, &clock).unwrap();
        let second = seq.current(&mut conn, &config, &clock).unwrap();

        assert_eq!(first, second);
        assert_eq!(conn.row_count("revisions"), 1);
        let row = &conn.rows("revisions")[0];
        assert_eq!(row.get("timestamp"), Some(Value::from("2024-03-01 12:00:00")));
        assert_eq!(row.get("username"), Some(Value::from("alice")));
        assert_eq!(row.get("description"), Some(Value::Null));
        assert_eq!(seq.revision().unwrap().username.as_deref(), Some("alice"));
    }

    #[test]
    fn locked_timestamp_wins_over_clock() {
        let mut conn = MemoryConnection::new();
        let locked = noon() - chrono::Duration::days(1);
        let config = AuditConfig::new().locked_timestamp(locked);
        let mut seq = RevisionSequencer::new();

        seq.current(&mut conn, &config, &FixedClock::new(noon())).unwrap();
        assert_eq!(seq.revision().unwrap().timestamp, locked);
    }

    #[test]
    fn custom_description_column() {
        let mut conn = MemoryConnection::new();
        let config = AuditConfig::new()
            .revision_table_name("ledger")
            .revision_description_field_name("note")
            .description("import");
        let mut seq = RevisionSequencer::new();

        seq.current(&mut conn, &config, &FixedClock::new(noon())).unwrap();
        let row = &conn.rows("ledger")[0];
        assert_eq!(row.get("note"), Some(Value::from("import")));
    }

    #[test]
    fn postgres_passes_sequence_name() {
        let mut conn = MemoryConnection::with_platform(Platform::Postgres);
        let mut seq = RevisionSequencer::new();

        let id = seq
            .current(&mut conn, &AuditConfig::new(), &FixedClock::new(noon()))
            .unwrap();
        assert_eq!(id, RevisionId::new(1));
    }

    #[test]
    fn postgres_with_wrong_sequence_fails() {
        let mut conn = MemoryConnection::with_platform(Platform::Postgres);
        let config = AuditConfig::new().revision_id_sequence("nope_seq");
        let mut seq = RevisionSequencer::new();

        assert!(seq.current(&mut conn, &config, &FixedClock::new(noon())).is_err());
        assert_eq!(seq.current_id(), None);
    }

    #[test]
    fn failed_insert_caches_nothing() {
        let mut conn = MemoryConnection::new();
        conn.fail_inserts_into("revisions");
        let mut seq = RevisionSequencer::new();
        let clock = FixedClock::new(noon());

        assert!(seq.current(&mut conn, &AuditConfig::new(), &clock).is_err());
        conn.clear_failures();
        let id = seq.current(&mut conn, &AuditConfig::new(), &clock).unwrap();
        assert_eq!(id, RevisionId::new(1));
    }
}
