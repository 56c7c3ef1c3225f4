//! # entaudit Driver
//!
//! Connection abstraction and SQL value model for entaudit.
//!
//! The audit engine never talks to a database directly. It hands statements
//! to a [`Connection`], which the host implements on top of its own driver,
//! inside the host's own transaction.
//!
//! ## Provided Types
//!
//! - [`Value`] - Closed set of runtime values bound to statements
//! - [`ColumnType`] - Per-parameter type tags
//! - [`Platform`] - Dialect differences (quoting, insert ids, conversions)
//! - [`MemoryConnection`] - In-memory connection for testing
//!
//! ## Example
//!
//! ```rust
//! use entaudit_driver::{ColumnType, Connection, MemoryConnection, Value};
//!
//! let mut conn = MemoryConnection::new();
//! conn.execute(
//!     "INSERT INTO notes (body) VALUES (?)",
//!     &[Value::from("hello")],
//!     &[ColumnType::Text],
//! )
//! .unwrap();
//! assert_eq!(conn.row_count("notes"), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod memory;
mod platform;
mod types;
mod value;

pub use connection::Connection;
pub use error::{DriverError, DriverResult};
pub use memory::{ExecutedStatement, MemoryConnection, Row};
pub use platform::Platform;
pub use types::ColumnType;
pub use value::Value;
