//! # entaudit Core
//!
//! Entity revisioning engine.
//!
//! Hooks into a host's unit-of-work lifecycle and, for every audited entity
//! type, writes a full snapshot of each inserted, updated or deleted instance
//! into a shadow table (`<prefix><table><suffix>`). All rows written during
//! one host transaction share a single revision, recorded once in the
//! revision ledger together with its timestamp, author and description.
//!
//! This crate provides:
//! - [`AuditListener`]: the hooks the host fires during a flush
//! - [`AuditTransaction`]: state carried from pre-commit to post-commit hooks
//! - [`StatementCache`]: shadow table inserts built from entity metadata
//! - [`DiffEncoder`]: per-field `[old, new]` diffs stored with updates
//! - [`MetadataRegistry`]: a ready-made [`MetadataSource`]
//!
//! The host supplies its unit of work through [`UnitOfWork`] and its database
//! through [`entaudit_driver::Connection`]. Audit rows are written on the
//! host's connection, inside the host's transaction.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_set;
mod clock;
mod config;
mod diff;
mod entity;
mod error;
mod listener;
mod metadata;
mod revision;
mod sql;
mod stats;
mod transaction;
mod types;
mod writer;

pub use change_set::{ChangeRecord, ChangeSetIndex};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuditConfig, ValueProvider};
pub use diff::{decode_diff, Diff, DiffEncoder, DiffValue};
pub use entity::{EntityData, EntityRef, Identifier, IdentifierResolver, UnitOfWork};
pub use error::{AuditError, AuditResult};
pub use listener::{AuditListener, HostEvent, LifecycleEvent};
pub use metadata::{
    AssociationDescriptor, AssociationKind, EntityTypeDescriptor, FieldDescriptor, JoinColumn,
    MetadataRegistry, MetadataSource,
};
pub use revision::RevisionSequencer;
pub use sql::{build_insert_statement, InsertStatement, ParamSlot, StatementCache};
pub use stats::AuditStats;
pub use transaction::{AuditTransaction, TransactionState};
pub use types::{OperationKind, Revision, RevisionId, TransactionId};
pub use writer::RevisionWriter;

pub use entaudit_driver::{ColumnType, Connection, DriverError, Platform, Value};
