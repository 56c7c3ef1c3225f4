//! In-memory connection for testing.

use crate::connection::Connection;
use crate::error::{DriverError, DriverResult};
use crate::platform::Platform;
use crate::types::ColumnType;
use crate::value::Value;
use std::collections::{BTreeMap, HashSet};

/// A statement that was run through a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    /// SQL text.
    pub sql: String,
    /// Bound parameters.
    pub params: Vec<Value>,
    /// Parameter type tags.
    pub types: Vec<ColumnType>,
}

/// A row stored by a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Auto-increment id assigned on insert.
    pub id: i64,
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Looks up a column value.
    ///
    /// `"id"` resolves to the generated id unless the insert named an `id`
    /// column itself.
    pub fn get(&self, column: &str) -> Option<Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.clone())
            .or_else(|| (column == "id").then_some(Value::Integer(self.id)))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    next_id: i64,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    last_insert: Option<i64>,
}

/// An in-memory connection.
///
/// Understands `INSERT INTO table (cols...) VALUES (...)` statements, which is
/// everything the audit engine issues. Suitable for:
/// - Unit tests
/// - Integration tests exercising full flush lifecycles
///
/// Every table gets an auto-increment id starting at 1. `begin`, `commit` and
/// `rollback` emulate the host transaction so tests can check that audit rows
/// share the fate of the primary writes.
///
/// # Example
///
/// ```rust
/// use entaudit_driver::{ColumnType, Connection, MemoryConnection, Value};
///
/// let mut conn = MemoryConnection::new();
/// conn.execute(
///     "INSERT INTO revisions (username) VALUES (?)",
///     &[Value::from("alice")],
///     &[ColumnType::String],
/// )
/// .unwrap();
/// assert_eq!(conn.last_insert_id(None).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryConnection {
    platform: Platform,
    state: MemoryState,
    saved: Option<MemoryState>,
    statements: Vec<ExecutedStatement>,
    failing_tables: HashSet<String>,
}

impl MemoryConnection {
    /// Creates an empty SQLite-flavoured connection.
    #[must_use]
    pub fn new() -> Self {
        Self::with_platform(Platform::Sqlite)
    }

    /// Creates an empty connection speaking the given dialect.
    #[must_use]
    pub fn with_platform(platform: Platform) -> Self {
        Self {
            platform,
            state: MemoryState::default(),
            saved: None,
            statements: Vec::new(),
            failing_tables: HashSet::new(),
        }
    }

    /// Makes every later insert into `table` fail.
    pub fn fail_inserts_into(&mut self, table: impl Into<String>) {
        self.failing_tables.insert(table.into());
    }

    /// Stops injecting failures.
    pub fn clear_failures(&mut self) {
        self.failing_tables.clear();
    }

    /// Starts a transaction. Nested calls join the open one.
    pub fn begin(&mut self) {
        if self.saved.is_none() {
            self.saved = Some(self.state.clone());
        }
    }

    /// Commits the open transaction.
    pub fn commit(&mut self) {
        self.saved = None;
    }

    /// Discards everything written since `begin`.
    pub fn rollback(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.state = saved;
        }
    }

    /// Returns the rows of a table (empty if it was never written).
    #[must_use]
    pub fn rows(&self, table: &str) -> &[Row] {
        self.state
            .tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the number of rows in a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Returns every statement executed so far, including failed ones.
    #[must_use]
    pub fn statements(&self) -> &[ExecutedStatement] {
        &self.statements
    }

    fn insert_row(&mut self, table: &str, columns: Vec<String>, params: &[Value]) -> i64 {
        let entry = self.state.tables.entry(table.to_string()).or_default();
        entry.next_id += 1;
        let id = entry.next_id;
        entry.rows.push(Row {
            id,
            columns: columns.into_iter().zip(params.iter().cloned()).collect(),
        });
        self.state.last_insert = Some(id);
        id
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MemoryConnection {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn execute(&mut self, sql: &str, params: &[Value], types: &[ColumnType]) -> DriverResult<u64> {
        self.statements.push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
            types: types.to_vec(),
        });

        let insert = parse_insert(sql).ok_or_else(|| DriverError::unsupported_statement(sql))?;

        if insert.placeholders != params.len() || params.len() != types.len() {
            return Err(DriverError::execution_failed(format!(
                "statement has {} placeholders but {} parameters and {} types were bound",
                insert.placeholders,
                params.len(),
                types.len()
            )));
        }
        if insert.columns.len() != params.len() {
            return Err(DriverError::execution_failed(format!(
                "{} columns named but {} values bound",
                insert.columns.len(),
                params.len()
            )));
        }
        if self.failing_tables.contains(&insert.table) {
            return Err(DriverError::execution_failed(format!(
                "insert into {} rejected",
                insert.table
            )));
        }

        self.insert_row(&insert.table, insert.columns, params);
        Ok(1)
    }

    fn last_insert_id(&mut self, sequence: Option<&str>) -> DriverResult<i64> {
        if !self.platform.requires_sequence_for_insert_id() {
            return self
                .state
                .last_insert
                .ok_or(DriverError::NoInsertId { sequence: None });
        }

        let missing = || DriverError::NoInsertId {
            sequence: sequence.map(str::to_string),
        };
        let sequence = sequence.ok_or_else(missing)?;
        self.state
            .tables
            .iter()
            .find(|(name, table)| format!("{name}_id_seq") == sequence && table.next_id > 0)
            .map(|(_, table)| table.next_id)
            .ok_or_else(missing)
    }
}

struct ParsedInsert {
    table: String,
    columns: Vec<String>,
    placeholders: usize,
}

const INSERT_PREFIX: &str = "INSERT INTO ";
const VALUES_MARKER: &str = ") VALUES (";

fn parse_insert(sql: &str) -> Option<ParsedInsert> {
    let sql = sql.trim();
    let prefix = sql.get(..INSERT_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(INSERT_PREFIX) {
        return None;
    }
    let rest = &sql[INSERT_PREFIX.len()..];

    let open = rest.find(" (")?;
    let table = unquote(rest[..open].trim());
    let body = &rest[open + 2..];

    let values_at = body.find(VALUES_MARKER)?;
    let columns = body[..values_at]
        .split(',')
        .map(|column| unquote(column.trim()))
        .collect();
    let values = body[values_at + VALUES_MARKER.len()..].strip_suffix(')')?;

    Some(ParsedInsert {
        table,
        columns,
        placeholders: values.matches('?').count(),
    })
}

fn unquote(identifier: &str) -> String {
    identifier
        .trim_matches(|c| c == '"' || c == '`')
        .replace("\"\"", "\"")
}
