//! Error types for driver operations.

use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a [`crate::Connection`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The database rejected or failed to run the statement.
    #[error("statement execution failed: {message}")]
    ExecutionFailed {
        /// Driver-provided failure description.
        message: String,
    },

    /// The statement is not one this connection can run.
    #[error("unsupported statement: {sql}")]
    UnsupportedStatement {
        /// The offending SQL text.
        sql: String,
    },

    /// No generated identifier is available.
    #[error("no generated identifier available (sequence: {sequence:?})")]
    NoInsertId {
        /// The sequence that was asked for, if any.
        sequence: Option<String>,
    },
}

impl DriverError {
    /// Creates an execution failed error.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Creates an unsupported statement error.
    pub fn unsupported_statement(sql: impl Into<String>) -> Self {
        Self::UnsupportedStatement { sql: sql.into() }
    }
}
