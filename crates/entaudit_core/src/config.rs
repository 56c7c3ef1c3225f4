//! Audit configuration.

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

/// Supplies an optional string at the moment a revision is opened
/// (the author identity or the revision description).
pub type ValueProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Configuration for the audit engine.
///
/// Names of the ledger table, the fixed shadow columns and the shadow table
/// affixes, plus the providers consulted when a revision is opened.
#[derive(Clone)]
pub struct AuditConfig {
    /// Prepended to an entity's table name to form its shadow table.
    pub table_prefix: String,

    /// Appended to an entity's table name to form its shadow table.
    pub table_suffix: String,

    /// Name of the revision ledger table.
    pub revision_table_name: String,

    /// Shadow column holding the revision id.
    pub revision_field_name: String,

    /// Shadow column holding the operation tag.
    pub revision_type_field_name: String,

    /// Shadow column holding the encoded diff.
    pub revision_diff_field_name: String,

    /// Ledger column holding the revision description.
    pub revision_description_field_name: String,

    /// Sequence backing the ledger id, for platforms that need one.
    /// Defaults to `<revision_table_name>_id_seq`.
    pub revision_id_sequence: Option<String>,

    /// Timestamp recorded on every revision instead of the clock's time.
    pub locked_timestamp: Option<NaiveDateTime>,

    /// `chrono` format used to render temporal values inside diffs.
    pub datetime_format: String,

    username_provider: Option<ValueProvider>,
    description_provider: Option<ValueProvider>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            table_suffix: "_audit".to_string(),
            revision_table_name: "revisions".to_string(),
            revision_field_name: "rev".to_string(),
            revision_type_field_name: "revtype".to_string(),
            revision_diff_field_name: "diff".to_string(),
            revision_description_field_name: "description".to_string(),
            revision_id_sequence: None,
            locked_timestamp: None,
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
            username_provider: None,
            description_provider: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("table_prefix", &self.table_prefix)
            .field("table_suffix", &self.table_suffix)
            .field("revision_table_name", &self.revision_table_name)
            .field("revision_field_name", &self.revision_field_name)
            .field("revision_type_field_name", &self.revision_type_field_name)
            .field("revision_diff_field_name", &self.revision_diff_field_name)
            .field(
                "revision_description_field_name",
                &self.revision_description_field_name,
            )
            .field("revision_id_sequence", &self.revision_id_sequence)
            .field("locked_timestamp", &self.locked_timestamp)
            .field("datetime_format", &self.datetime_format)
            .field("username_provider", &self.username_provider.is_some())
            .field("description_provider", &self.description_provider.is_some())
            .finish()
    }
}

impl AuditConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shadow table prefix.
    #[must_use]
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Sets the shadow table suffix.
    #[must_use]
    pub fn table_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.table_suffix = suffix.into();
        self
    }

    /// Sets the ledger table name.
    #[must_use]
    pub fn revision_table_name(mut self, name: impl Into<String>) -> Self {
        self.revision_table_name = name.into();
        self
    }

    /// Sets the revision id column name.
    #[must_use]
    pub fn revision_field_name(mut self, name: impl Into<String>) -> Self {
        self.revision_field_name = name.into();
        self
    }

    /// Sets the operation tag column name.
    #[must_use]
    pub fn revision_type_field_name(mut self, name: impl Into<String>) -> Self {
        self.revision_type_field_name = name.into();
        self
    }

    /// Sets the diff column name.
    #[must_use]
    pub fn revision_diff_field_name(mut self, name: impl Into<String>) -> Self {
        self.revision_diff_field_name = name.into();
        self
    }

    /// Sets the ledger description column name.
    #[must_use]
    pub fn revision_description_field_name(mut self, name: impl Into<String>) -> Self {
        self.revision_description_field_name = name.into();
        self
    }

    /// Sets the sequence backing the ledger id.
    #[must_use]
    pub fn revision_id_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.revision_id_sequence = Some(sequence.into());
        self
    }

    /// Pins every revision timestamp to `at`.
    #[must_use]
    pub fn locked_timestamp(mut self, at: NaiveDateTime) -> Self {
        self.locked_timestamp = Some(at);
        self
    }

    /// Sets the format temporal diff values are rendered with.
    #[must_use]
    pub fn datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Records the same author on every revision.
    #[must_use]
    pub fn username(self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.username_provider(move || Some(username.clone()))
    }

    /// Asks `provider` for the author each time a revision is opened.
    #[must_use]
    pub fn username_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.username_provider = Some(Arc::new(provider));
        self
    }

    /// Records the same description on every revision.
    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description_provider(move || Some(description.clone()))
    }

    /// Asks `provider` for the description each time a revision is opened.
    #[must_use]
    pub fn description_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.description_provider = Some(Arc::new(provider));
        self
    }

    /// Returns the current author, if any.
    #[must_use]
    pub fn current_username(&self) -> Option<String> {
        self.username_provider.as_ref().and_then(|provider| provider())
    }

    /// Returns the current revision description, if any.
    #[must_use]
    pub fn current_description(&self) -> Option<String> {
        self.description_provider
            .as_ref()
            .and_then(|provider| provider())
    }

    /// Returns the shadow table name for an entity table.
    #[must_use]
    pub fn shadow_table_name(&self, base_table: &str) -> String {
        format!("{}{}{}", self.table_prefix, base_table, self.table_suffix)
    }

    /// Returns the sequence backing the ledger id.
    #[must_use]
    pub fn revision_id_sequence_name(&self) -> String {
        self.revision_id_sequence
            .clone()
            .unwrap_or_else(|| format!("{}_id_seq", self.revision_table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.shadow_table_name("invoice"), "invoice_audit");
        assert_eq!(config.revision_table_name, "revisions");
        assert_eq!(config.revision_id_sequence_name(), "revisions_id_seq");
        assert_eq!(config.current_username(), None);
        assert_eq!(config.current_description(), None);
    }

    #[test]
    fn builder_pattern() {
        let config = AuditConfig::new()
            .table_prefix("hist_")
            .table_suffix("")
            .revision_table_name("ledger")
            .revision_id_sequence("ledger_seq")
            .username("alice")
            .description("nightly import");

        assert_eq!(config.shadow_table_name("invoice"), "hist_invoice");
        assert_eq!(config.revision_id_sequence_name(), "ledger_seq");
        assert_eq!(config.current_username().as_deref(), Some("alice"));
        assert_eq!(config.current_description().as_deref(), Some("nightly import"));
    }

    #[test]
    fn providers_are_consulted_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let config = AuditConfig::new().username_provider(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            Some(format!("user-{n}"))
        });

        assert_eq!(config.current_username().as_deref(), Some("user-0"));
        assert_eq!(config.current_username().as_deref(), Some("user-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_hides_providers() {
        let config = AuditConfig::new().username("alice");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("username_provider: true"));
        assert!(!rendered.contains("alice"));
    }
}
