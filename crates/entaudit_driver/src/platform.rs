//! Database platform dialects.

use std::fmt;

/// The SQL dialect a connection speaks.
///
/// Platforms differ in identifier quoting, in how the id generated by the
/// last insert is retrieved, and in the SQL needed to convert some bound
/// values on the database side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    MySql,
}

impl Platform {
    /// Returns the platform name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Platform::Sqlite => "sqlite",
            Platform::Postgres => "postgresql",
            Platform::MySql => "mysql",
        }
    }

    /// Returns the `chrono` format the platform stores timestamps in.
    #[must_use]
    pub const fn datetime_format(self) -> &'static str {
        "%Y-%m-%d %H:%M:%S"
    }

    /// Whether `last_insert_id` must be given the backing sequence name.
    #[must_use]
    pub const fn requires_sequence_for_insert_id(self) -> bool {
        matches!(self, Platform::Postgres)
    }

    /// Quotes an identifier for this platform.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Platform::Sqlite | Platform::Postgres => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
            Platform::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
