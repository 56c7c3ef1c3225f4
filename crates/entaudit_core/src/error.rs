//! Error types for the audit engine.

use entaudit_driver::DriverError;
use thiserror::Error;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur while writing revisions.
///
/// Any error aborts the host transaction: audit rows and primary writes must
/// commit together or not at all.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The connection failed to run a statement.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// An audited type, or the target of one of its associations, has no
    /// metadata.
    #[error("unknown entity type: {type_name}")]
    UnknownEntityType {
        /// The type that was looked up.
        type_name: String,
    },

    /// The unit of work has no state for an instance it reported.
    #[error("entity {entity} is not managed by the unit of work")]
    UnmanagedEntity {
        /// Description of the instance.
        entity: String,
    },

    /// An identifier field has no value.
    #[error("missing identifier {field} for {type_name}")]
    MissingIdentifier {
        /// Entity type.
        type_name: String,
        /// Identifier field(s) without a value.
        field: String,
    },

    /// A related instance is present but its identifier cannot be resolved.
    #[error("cannot resolve {target_type} identifier for association {association} of {type_name}")]
    UnresolvableAssociation {
        /// Entity type owning the association.
        type_name: String,
        /// Association field.
        association: String,
        /// Related entity type.
        target_type: String,
    },

    /// A join column references a column its target type does not map.
    #[error("{target_type} has no field mapped to column {column}")]
    UnknownJoinColumn {
        /// Related entity type.
        target_type: String,
        /// Referenced column.
        column: String,
    },

    /// A stored diff could not be parsed.
    #[error("invalid diff: {message}")]
    DiffDecoding {
        /// Parser message.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl AuditError {
    /// Creates an unknown entity type error.
    pub fn unknown_entity_type(type_name: impl Into<String>) -> Self {
        Self::UnknownEntityType {
            type_name: type_name.into(),
        }
    }

    /// Creates an unmanaged entity error.
    pub fn unmanaged_entity(entity: impl Into<String>) -> Self {
        Self::UnmanagedEntity {
            entity: entity.into(),
        }
    }

    /// Creates a missing identifier error.
    pub fn missing_identifier(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
