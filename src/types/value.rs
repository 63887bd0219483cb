use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// A value as it arrives from an editor or a form, before persistence.
///
/// Unlike [`serde_json::Value`] this can express "no value at all"
/// ([`RawValue::Absent`]) and native temporal values produced by date and
/// time pickers. Neither can be written to the store as-is; see
/// [`crate::record::sanitize`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Temporal(DateTime<FixedOffset>),
    Array(Vec<RawValue>),
    Object(BTreeMap<String, RawValue>),
}

/// Field values submitted by a form or an inline row editor.
pub type FormValues = BTreeMap<String, RawValue>;

impl RawValue {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }

    /// True for `Absent` and `Null`.
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, RawValue::Absent | RawValue::Null)
    }

    /// Loose truthiness: absent, null, `false`, zero, NaN and the empty
    /// string are false; everything else is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::Absent | RawValue::Null => false,
            RawValue::Bool(b) => *b,
            RawValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            RawValue::String(s) => !s.is_empty(),
            RawValue::Temporal(_) | RawValue::Array(_) | RawValue::Object(_) => true,
        }
    }

    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        number_from_f64(value).map_or(RawValue::Null, RawValue::Number)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => RawValue::Number(n),
            Value::String(s) => RawValue::String(s),
            Value::Array(items) => RawValue::Array(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, RawValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        RawValue::from(value.clone())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value.into())
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Temporal(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        RawValue::Temporal(value)
    }
}

/// Canonical string form of a temporal value: UTC, millisecond precision,
/// `Z` suffix.
#[must_use]
pub fn iso_string(value: &DateTime<FixedOffset>) -> String {
    value
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wire format for document timestamps (`createdDate`, `updatedAt`, ...).
#[must_use]
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lenient timestamp read; documents written by other clients may carry
/// malformed values, which are logged and treated as missing.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => match parse_temporal(s) {
            Some(dt) => Some(dt.with_timezone(&Utc)),
            None => {
                tracing::warn!("Invalid timestamp in document: '{}'", s);
                None
            }
        },
        Value::Null => None,
        other => {
            tracing::warn!("Invalid timestamp in document: {}", other);
            None
        }
    }
}

/// Parses the textual temporal forms editors and imports produce.
///
/// Date-only text is anchored at midnight UTC, time-only text on
/// 1970-01-01 UTC.
#[must_use]
pub fn parse_temporal(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ndt.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }
    for format in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return Some(NaiveDate::default().and_time(time).and_utc().fixed_offset());
        }
    }
    None
}

/// Builds a JSON number, preferring an integer representation for integral
/// values so stored numbers compare equal regardless of how they were typed.
#[must_use]
pub fn number_from_f64(value: f64) -> Option<Number> {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_SAFE {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

/// Number formatting without a trailing `.0` for integral floats.
#[must_use]
pub fn number_to_string(value: &Number) -> String {
    if let Some(i) = value.as_i64() {
        return i.to_string();
    }
    if let Some(u) = value.as_u64() {
        return u.to_string();
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => value.to_string(),
    }
}

/// String coercion of a stored value, as used by search, filters and plain
/// cell rendering. Arrays and objects render as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!RawValue::Absent.is_truthy());
        assert!(!RawValue::from("").is_truthy());
        assert!(!RawValue::from(0_i64).is_truthy());
        assert!(RawValue::from("false").is_truthy());
        assert!(RawValue::Array(vec![]).is_truthy());
    }

    #[test]
    fn test_from_json_preserves_structure() {
        let raw = RawValue::from(json!({"a": [1, null], "b": "x"}));
        let RawValue::Object(map) = raw else {
            panic!("expected object");
        };
        assert_eq!(
            map["a"],
            RawValue::Array(vec![RawValue::from(1_i64), RawValue::Null])
        );
        assert_eq!(map["b"], RawValue::from("x"));
    }

    #[test]
    fn test_parse_temporal_forms() {
        let full = parse_temporal("2024-01-31T10:00:00+02:00").unwrap();
        assert_eq!(iso_string(&full), "2024-01-31T08:00:00.000Z");

        let date = parse_temporal("2024-01-31").unwrap();
        assert_eq!(iso_string(&date), "2024-01-31T00:00:00.000Z");

        let time = parse_temporal("09:30").unwrap();
        assert_eq!(iso_string(&time), "1970-01-01T09:30:00.000Z");

        assert!(parse_temporal("next tuesday").is_none());
    }

    #[test]
    fn test_number_helpers() {
        assert_eq!(number_from_f64(30.0), Some(Number::from(30)));
        assert_eq!(number_to_string(&Number::from_f64(2.5).unwrap()), "2.5");
        assert_eq!(number_to_string(&Number::from_f64(1e3).unwrap()), "1000");
        assert!(number_from_f64(f64::NAN).is_none());
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("Smith")), "Smith");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(["a", 1])), "[\"a\",1]");
    }
}
