//! Metadata source instrumentation.

use entaudit_core::{AuditError, AuditResult, EntityTypeDescriptor, MetadataSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Wraps a metadata source and counts descriptor lookups per type.
pub struct CountingMetadata {
    inner: Arc<dyn MetadataSource>,
    lookups: Mutex<HashMap<String, usize>>,
}

impl CountingMetadata {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn MetadataSource>) -> Self {
        Self {
            inner,
            lookups: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a descriptor, failing for unknown types.
    ///
    /// Shaped for [`entaudit_core::StatementCache::get_or_build_with`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type has no descriptor.
    pub fn load(&self, type_name: &str) -> AuditResult<Arc<EntityTypeDescriptor>> {
        self.descriptor(type_name)
            .ok_or_else(|| AuditError::unknown_entity_type(type_name))
    }

    /// Returns how often `type_name`'s descriptor was requested.
    #[must_use]
    pub fn lookups(&self, type_name: &str) -> usize {
        self.lookups.lock().get(type_name).copied().unwrap_or(0)
    }

    /// Returns the total number of descriptor requests.
    #[must_use]
    pub fn total_lookups(&self) -> usize {
        self.lookups.lock().values().sum()
    }

    /// Resets every counter.
    pub fn reset(&self) {
        self.lookups.lock().clear();
    }
}

impl MetadataSource for CountingMetadata {
    fn descriptor(&self, type_name: &str) -> Option<Arc<EntityTypeDescriptor>> {
        *self.lookups.lock().entry(type_name.to_string()).or_insert(0) += 1;
        self.inner.descriptor(type_name)
    }

    fn is_audited(&self, type_name: &str) -> bool {
        self.inner.is_audited(type_name)
    }
}
