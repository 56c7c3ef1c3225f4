//! Connection trait definition.

use crate::error::DriverResult;
use crate::platform::Platform;
use crate::types::ColumnType;
use crate::value::Value;

/// A database connection as seen by the audit engine.
///
/// Connections only need to run parameterized statements and report the id
/// generated by the last insert. Transaction boundaries belong to the host:
/// every statement runs inside whatever transaction the host has open, so
/// audit rows commit or roll back together with the primary writes.
///
/// # Invariants
///
/// - `params` and `types` passed to `execute` have the same length and line
///   up with the statement's placeholders
/// - `last_insert_id` reflects the most recent successful insert
///
/// # Implementors
///
/// - [`super::MemoryConnection`] - For testing
pub trait Connection {
    /// Returns the dialect of this connection.
    fn platform(&self) -> Platform;

    /// Executes a parameterized statement.
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be run.
    fn execute(&mut self, sql: &str, params: &[Value], types: &[ColumnType]) -> DriverResult<u64>;

    /// Returns the id generated by the most recent insert.
    ///
    /// Platforms that allocate ids from sequences need the sequence name;
    /// others ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error if no id is available.
    fn last_insert_id(&mut self, sequence: Option<&str>) -> DriverResult<i64>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn platform(&self) -> Platform {
        (**self).platform()
    }

    fn execute(&mut self, sql: &str, params: &[Value], types: &[ColumnType]) -> DriverResult<u64> {
        (**self).execute(sql, params, types)
    }

    fn last_insert_id(&mut self, sequence: Option<&str>) -> DriverResult<i64> {
        (**self).last_insert_id(sequence)
    }
}
