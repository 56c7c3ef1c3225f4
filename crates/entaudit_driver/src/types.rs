//! Column type tags.

use crate::platform::Platform;
use std::fmt;

/// The logical type of a column, passed to the driver with every bound
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// 16-bit integer.
    SmallInt,
    /// Boolean.
    Boolean,
    /// Floating point.
    Float,
    /// Exact decimal.
    Decimal,
    /// Short string.
    String,
    /// Long text.
    Text,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without offset.
    DateTime,
    /// Timestamp with offset.
    DateTimeTz,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Binary blob.
    Binary,
    /// A host-defined type.
    Custom {
        /// Type name.
        name: String,
        /// SQL wrapping the bound placeholder, with `?` marking where the
        /// placeholder goes (e.g. `ST_GeomFromText(?)`).
        conversion_sql: Option<String>,
    },
}

impl ColumnType {
    /// Creates a custom type with an optional conversion template.
    pub fn custom(name: impl Into<String>, conversion_sql: Option<&str>) -> Self {
        Self::Custom {
            name: name.into(),
            conversion_sql: conversion_sql.map(str::to_string),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::DateTimeTz => "datetimetz",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "json",
            ColumnType::Binary => "binary",
            ColumnType::Custom { name, .. } => name,
        }
    }

    /// Wraps `placeholder` in the SQL that converts a bound value of this type
    /// on the database side.
    ///
    /// Types with no conversion on `platform` return the placeholder as is.
    #[must_use]
    pub fn convert_to_database_value_sql(&self, placeholder: &str, platform: Platform) -> String {
        match (self, platform) {
            (ColumnType::Json, Platform::Postgres) => format!("CAST({placeholder} AS JSONB)"),
            (ColumnType::Json, Platform::MySql) => format!("CAST({placeholder} AS JSON)"),
            (ColumnType::Json, Platform::Sqlite) => format!("json({placeholder})"),
            (ColumnType::Uuid, Platform::Postgres) => format!("CAST({placeholder} AS UUID)"),
            (ColumnType::Uuid, Platform::MySql) => format!("UUID_TO_BIN({placeholder})"),
            (
                ColumnType::Custom {
                    conversion_sql: Some(template),
                    ..
                },
                _,
            ) => template.replace('?', placeholder),
            _ => placeholder.to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
