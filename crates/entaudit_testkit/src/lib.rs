//! # entaudit Testkit
//!
//! Test utilities for entaudit.
//!
//! This crate provides:
//! - [`MemoryUnitOfWork`]: a map-backed host unit of work
//! - [`CountingMetadata`]: a metadata source that counts lookups
//! - [`fixtures`]: a small billing schema and sample instance state
//! - [`FlushHarness`]: a simulated host firing hooks in flush order
//! - proptest strategies for change records
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entaudit_testkit::prelude::*;
//!
//! #[test]
//! fn update_is_audited() {
//!     let mut host = FlushHarness::billing();
//!     let invoice = host.uow_mut().manage(INVOICE, invoice_data(100, None));
//!     host.flush(Flush::new().insert(&invoice)).unwrap();
//!
//!     let changes = ChangeRecord::new().with_change("amount", 100i64, 150i64);
//!     let outcome = host.flush(Flush::new().update(&invoice, changes)).unwrap();
//!     assert_eq!(outcome.stats.updates, 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod metadata;
pub mod uow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use crate::init_tracing;
    pub use crate::metadata::*;
    pub use crate::uow::*;
    pub use entaudit_core::*;
    pub use entaudit_driver::{MemoryConnection, Row};
}

pub use harness::{Flush, FlushHarness, FlushOutcome};
pub use metadata::CountingMetadata;
pub use uow::MemoryUnitOfWork;

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber.
///
/// Reads the filter from `RUST_LOG` (default `warn`). Safe to call from
/// every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Fails once a subscriber is installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
