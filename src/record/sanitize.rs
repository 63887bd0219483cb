use serde_json::{Map, Value};

use crate::types::{FormValues, RawValue, iso_string};

/// Converts an editor value tree into a storable JSON tree.
///
/// Absence becomes an explicit `null` and temporal values become their
/// canonical ISO string; everything else keeps its shape.
#[must_use]
pub fn sanitize(value: &RawValue) -> Value {
    match value {
        RawValue::Absent | RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Number(n) => Value::Number(n.clone()),
        RawValue::String(s) => Value::String(s.clone()),
        RawValue::Temporal(dt) => Value::String(iso_string(dt)),
        RawValue::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        RawValue::Object(map) => Value::Object(sanitize_map(map)),
    }
}

#[must_use]
pub fn sanitize_map(values: &FormValues) -> Map<String, Value> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), sanitize(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_absent_becomes_null() {
        let mut inner = FormValues::new();
        inner.insert("gone".to_string(), RawValue::Absent);
        inner.insert("kept".to_string(), RawValue::from("x"));
        let value = RawValue::Array(vec![RawValue::Absent, RawValue::Object(inner)]);

        assert_eq!(sanitize(&value), json!([null, {"gone": null, "kept": "x"}]));
    }

    #[test]
    fn test_temporal_becomes_iso_string() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        assert_eq!(
            sanitize(&RawValue::from(dt)),
            json!("2024-01-31T08:00:00.000Z")
        );
    }

    fn raw_value() -> impl Strategy<Value = RawValue> {
        let leaf = prop_oneof![
            Just(RawValue::Absent),
            Just(RawValue::Null),
            any::<bool>().prop_map(RawValue::Bool),
            any::<i64>().prop_map(RawValue::from),
            "[a-z]{0,8}".prop_map(RawValue::String),
            (0i64..4_000_000_000_000).prop_map(|ms| {
                RawValue::from(Utc.timestamp_millis_opt(ms).unwrap())
            }),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(RawValue::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(RawValue::Object),
            ]
        })
    }

    fn contains_absent(value: &RawValue) -> bool {
        match value {
            RawValue::Absent => true,
            RawValue::Array(items) => items.iter().any(contains_absent),
            RawValue::Object(map) => map.values().any(contains_absent),
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(value in raw_value()) {
            let once = sanitize(&value);
            let twice = sanitize(&RawValue::from(&once));
            prop_assert_eq!(&once, &twice);
            prop_assert!(!contains_absent(&RawValue::from(once)));
        }
    }
}
