//! Diff encoding.
//!
//! A diff maps each changed field to its `[old, new]` pair. Values are
//! reduced to plain JSON scalars so the stored diff stays readable without
//! the entity's type information:
//!
//! - primitives pass through unchanged
//! - temporals are rendered with the configured `chrono` format
//! - everything else is rendered as its canonical text
//!
//! ```
//! use entaudit_core::{ChangeRecord, DiffEncoder, decode_diff};
//!
//! let record = ChangeRecord::new().with_change("amount", 100i64, 150i64);
//! let encoded = DiffEncoder::new("%Y-%m-%d").encode(Some(&record)).unwrap();
//! assert_eq!(encoded, r#"{"amount":[100,150]}"#);
//! assert_eq!(decode_diff(&encoded).unwrap().len(), 1);
//! ```

use crate::change_set::ChangeRecord;
use crate::error::{AuditError, AuditResult};
use entaudit_driver::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A diff value as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffValue {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Finite float.
    Float(f64),
    /// Text, including rendered temporals and stringified values.
    Text(String),
}

impl From<i64> for DiffValue {
    fn from(n: i64) -> Self {
        DiffValue::Integer(n)
    }
}

impl From<&str> for DiffValue {
    fn from(s: &str) -> Self {
        DiffValue::Text(s.to_string())
    }
}

/// Field name → `(old, new)` for one instance at one revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diff(BTreeMap<String, (DiffValue, DiffValue)>);

impl Diff {
    /// Returns the change of one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&(DiffValue, DiffValue)> {
        self.0.get(field)
    }

    /// Iterates over changed field names.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Converts change records into stored diffs.
#[derive(Debug, Clone, Copy)]
pub struct DiffEncoder<'a> {
    datetime_format: &'a str,
}

impl<'a> DiffEncoder<'a> {
    /// Creates an encoder rendering temporals with `datetime_format`.
    #[must_use]
    pub const fn new(datetime_format: &'a str) -> Self {
        Self { datetime_format }
    }

    /// Reduces one value to its stored form.
    #[must_use]
    pub fn render(&self, value: &Value) -> DiffValue {
        match value {
            Value::Null => DiffValue::Null,
            Value::Bool(b) => DiffValue::Bool(*b),
            Value::Integer(n) => DiffValue::Integer(*n),
            // JSON has no NaN or infinity.
            Value::Float(x) if x.is_finite() => DiffValue::Float(*x),
            Value::Text(s) => DiffValue::Text(s.clone()),
            temporal if temporal.is_temporal() => DiffValue::Text(
                temporal
                    .format_temporal(self.datetime_format)
                    .unwrap_or_else(|| temporal.to_string()),
            ),
            other => DiffValue::Text(other.to_string()),
        }
    }

    /// Reduces a whole change record.
    #[must_use]
    pub fn to_diff(&self, record: &ChangeRecord) -> Diff {
        Diff(
            record
                .iter()
                .map(|(field, old, new)| (field.to_string(), (self.render(old), self.render(new))))
                .collect(),
        )
    }

    /// Encodes a change record for the diff column.
    ///
    /// No record yields `None` (a NULL column), which is distinct from an
    /// empty record (`"{}"`).
    #[must_use]
    pub fn encode(&self, record: Option<&ChangeRecord>) -> Option<String> {
        let diff = self.to_diff(record?);
        Some(serde_json::to_string(&diff).unwrap_or_else(|err| {
            warn!(error = %err, "diff serialization failed, storing debug text");
            format!("{diff:?}")
        }))
    }
}

/// Parses a stored diff.
///
/// # Errors
///
/// Returns `DiffDecoding` if the text is not a diff.
pub fn decode_diff(encoded: &str) -> AuditResult<Diff> {
    serde_json::from_str(encoded).map_err(|err| AuditError::DiffDecoding {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    const DATE_ONLY: &str = "%Y-%m-%d";

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn absent_record_is_null_diff() {
        assert_eq!(DiffEncoder::new(DATE_ONLY).encode(None), None);
    }

    #[test]
    fn empty_record_is_empty_object() {
        let encoded = DiffEncoder::new(DATE_ONLY).encode(Some(&ChangeRecord::new()));
        assert_eq!(encoded.as_deref(), Some("{}"));
    }

    #[test]
    fn integer_change_keeps_only_changed_field() {
        let record = ChangeRecord::new().with_change("amount", 100i64, 150i64);
        let encoded = DiffEncoder::new(DATE_ONLY).encode(Some(&record)).unwrap();

        let diff = decode_diff(&encoded).unwrap();
        assert_eq!(diff.fields().collect::<Vec<_>>(), vec!["amount"]);
        assert_eq!(diff.get("amount"), Some(&(100i64.into(), 150i64.into())));
    }

    #[test]
    fn temporal_uses_configured_format() {
        let record = ChangeRecord::new().with_change(
            "issuedOn",
            march_first(),
            march_first().succ_opt().unwrap(),
        );
        let encoded = DiffEncoder::new(DATE_ONLY).encode(Some(&record)).unwrap();
        assert!(encoded.contains("\"2024-03-01\""));

        let diff = decode_diff(&encoded).unwrap();
        assert_eq!(
            diff.get("issuedOn"),
            Some(&("2024-03-01".into(), "2024-03-02".into()))
        );
    }

    #[test]
    fn datetime_with_time_format() {
        let encoder = DiffEncoder::new("%d.%m.%Y %H:%M");
        let at = march_first().and_hms_opt(8, 5, 0).unwrap();
        assert_eq!(encoder.render(&Value::DateTime(at)), "01.03.2024 08:05".into());
    }

    #[test]
    fn structured_values_become_text() {
        let encoder = DiffEncoder::new(DATE_ONLY);
        assert_eq!(
            encoder.render(&Value::Decimal("19.90".into())),
            "19.90".into()
        );
        assert_eq!(
            encoder.render(&Value::Json(serde_json::json!({"k": [1, 2]}))),
            r#"{"k":[1,2]}"#.into()
        );
        assert_eq!(encoder.render(&Value::Bytes(vec![1, 255])), "01ff".into());
    }

    #[test]
    fn primitives_pass_through() {
        let encoder = DiffEncoder::new(DATE_ONLY);
        assert_eq!(encoder.render(&Value::Null), DiffValue::Null);
        assert_eq!(encoder.render(&Value::Bool(true)), DiffValue::Bool(true));
        assert_eq!(encoder.render(&Value::Float(1.5)), DiffValue::Float(1.5));
        assert_eq!(encoder.render(&Value::from("x")), "x".into());
    }

    #[test]
    fn non_finite_float_falls_back_to_text() {
        let encoder = DiffEncoder::new(DATE_ONLY);
        assert_eq!(encoder.render(&Value::Float(f64::NAN)), "NaN".into());
        assert_eq!(encoder.render(&Value::Float(f64::INFINITY)), "inf".into());
    }

    #[test]
    fn null_to_value_change() {
        let record = ChangeRecord::new().with_change("notes", Value::Null, "paid late");
        let encoded = DiffEncoder::new(DATE_ONLY).encode(Some(&record)).unwrap();
        assert_eq!(encoded, r#"{"notes":[null,"paid late"]}"#);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(matches!(
            decode_diff("not json"),
            Err(AuditError::DiffDecoding { .. })
        ));
        assert!(decode_diff(r#"{"a": [1]}"#).is_err());
    }

    proptest! {
        #[test]
        fn diff_lists_exactly_the_changed_fields(
            changes in prop::collection::btree_map("[a-z]{1,8}", (any::<i64>(), any::<i64>()), 0..8)
        ) {
            let record: ChangeRecord = changes
                .iter()
                .map(|(f, (o, n))| (f.clone(), (Value::Integer(*o), Value::Integer(*n))))
                .collect();
            let encoded = DiffEncoder::new(DATE_ONLY).encode(Some(&record)).unwrap();
            let diff = decode_diff(&encoded).unwrap();

            prop_assert_eq!(diff.len(), changes.len());
            for (field, (old, new)) in &changes {
                prop_assert_eq!(
                    diff.get(field),
                    Some(&(DiffValue::Integer(*old), DiffValue::Integer(*new)))
                );
            }
        }
    }
}
