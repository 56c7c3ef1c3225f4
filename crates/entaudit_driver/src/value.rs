//! Runtime values bound to SQL parameters.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A dynamic SQL value.
///
/// The variants form a closed set in three groups:
/// - primitives (`Null`, `Bool`, `Integer`, `Float`, `Text`)
/// - temporals (`Date`, `Time`, `DateTime`, `DateTimeTz`)
/// - values that are only meaningful through their text form
///   (`Uuid`, `Decimal`, `Json`, `Bytes`)
///
/// Floats compare and hash by their bit pattern, so `Value` can be used as a
/// map key (entity identifiers are built from values).
#[derive(Debug, Clone)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time without an offset.
    DateTime(NaiveDateTime),
    /// Date and time with a fixed UTC offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// UUID.
    Uuid(Uuid),
    /// Exact decimal in canonical text form (e.g. `"19.99"`).
    Decimal(String),
    /// JSON document.
    Json(serde_json::Value),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a date, time or timestamp.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) | Value::DateTimeTz(_)
        )
    }

    /// Get this value as a string, if it is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders a temporal value with a `chrono` strftime format.
    ///
    /// Returns `None` for non-temporal values. A format string chrono cannot
    /// render falls back to the value's default text form.
    pub fn format_temporal(&self, format: &str) -> Option<String> {
        let mut out = String::new();
        let written = match self {
            Value::Date(d) => write!(out, "{}", d.format(format)),
            Value::Time(t) => write!(out, "{}", t.format(format)),
            Value::DateTime(dt) => write!(out, "{}", dt.format(format)),
            Value::DateTimeTz(dt) => write!(out, "{}", dt.format(format)),
            _ => return None,
        };
        match written {
            Ok(()) => Some(out),
            Err(_) => Some(self.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeTz(a), Value::DateTimeTz(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) | Value::Decimal(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Time(t) => t.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::DateTimeTz(dt) => dt.hash(state),
            Value::Uuid(u) => u.hash(state),
            // serde_json::Value has no Hash; its serialization is canonical enough
            // for equal documents to hash equally.
            Value::Json(j) => j.to_string().hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) | Value::Decimal(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTimeTz(dt) => f.write_str(&dt.to_rfc3339()),
            Value::Uuid(u) => write!(f, "{}", u.hyphenated()),
            Value::Json(j) => write!(f, "{j}"),
            Value::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }

    #[test]
    fn values_usable_as_set_members() {
        let mut set = HashSet::new();
        set.insert(Value::Integer(42));
        set.insert(Value::Integer(42));
        set.insert(Value::Text("42".into()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn format_temporal_uses_given_format() {
        let value = Value::Date(date(2024, 3, 1));
        assert_eq!(value.format_temporal("%d/%m/%Y").as_deref(), Some("01/03/2024"));
        assert_eq!(Value::Integer(1).format_temporal("%Y"), None);
    }

    #[test]
    fn format_temporal_falls_back_on_bad_format() {
        let value = Value::Date(date(2024, 3, 1));
        assert_eq!(value.format_temporal("%Q").as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn display_renders_canonical_text() {
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "dead");
        assert_eq!(Value::Decimal("19.99".into()).to_string(), "19.99");
        assert_eq!(
            Value::Json(serde_json::json!({"a": 1})).to_string(),
            r#"{"a":1}"#
        );
        let dt = date(2024, 3, 1).and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2024-03-01 12:30:00");
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
    }
}
