use chrono::DateTime;
use serde_json::{Map, Value};

use super::sanitize::sanitize;
use crate::error::{Error, Result};
use crate::types::{
    FieldDefinition, FieldType, FormValues, RawValue, SchemaDocument, iso_string,
    number_from_f64, number_to_string, parse_temporal,
};

/// Value written for a declared field that the submission left out.
#[must_use]
pub fn default_for(field_type: &FieldType) -> RawValue {
    match field_type {
        FieldType::String { .. } => RawValue::String(String::new()),
        FieldType::Number | FieldType::Integer => RawValue::from(0_i64),
        FieldType::Boolean => RawValue::Bool(false),
        FieldType::Array => RawValue::Array(Vec::new()),
        FieldType::Object => RawValue::Object(FormValues::new()),
        FieldType::Other(_) => RawValue::Null,
    }
}

/// Coerces an editor value to the storable form of the field's declared
/// type.
///
/// Text that cannot be read as the declared number or temporal type is a
/// validation failure rather than a silent zero.
pub fn normalize(raw: &RawValue, def: &FieldDefinition) -> Result<Value> {
    match &def.field_type {
        FieldType::String { .. } if def.component().is_temporal() => normalize_temporal(raw),
        FieldType::String { .. } => Ok(Value::String(string_of(raw))),
        FieldType::Number => normalize_number(raw, false),
        FieldType::Integer => normalize_number(raw, true),
        FieldType::Boolean => Ok(Value::Bool(raw.is_truthy())),
        FieldType::Array => match raw {
            RawValue::Array(_) => Ok(sanitize(raw)),
            _ => Ok(Value::Array(Vec::new())),
        },
        FieldType::Object => match raw {
            RawValue::Object(_) => Ok(sanitize(raw)),
            _ => Ok(Value::Object(Map::new())),
        },
        FieldType::Other(_) => Ok(sanitize(raw)),
    }
}

/// Runs every declared field through [`normalize`], substituting the
/// per-type default for fields the submission does not carry. Keys outside
/// the schema are ignored.
pub fn normalize_form(schema: &SchemaDocument, values: &FormValues) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (key, def) in schema.fields().iter() {
        let value = match values.get(key) {
            Some(raw) if !raw.is_absent() => normalize(raw, def),
            _ => normalize(&default_for(&def.field_type), def),
        }
        .map_err(|e| match e {
            Error::Validation(detail) => {
                Error::Validation(format!("{}: {detail}", def.display_title(key)))
            }
            other => other,
        })?;
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn string_of(raw: &RawValue) -> String {
    match raw {
        RawValue::Absent | RawValue::Null => String::new(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Number(n) => number_to_string(n),
        RawValue::String(s) => s.clone(),
        RawValue::Temporal(dt) => iso_string(dt),
        RawValue::Array(_) | RawValue::Object(_) => sanitize(raw).to_string(),
    }
}

fn normalize_temporal(raw: &RawValue) -> Result<Value> {
    match raw {
        RawValue::Absent | RawValue::Null => Ok(Value::Null),
        RawValue::String(s) if s.trim().is_empty() => Ok(Value::Null),
        RawValue::String(s) => parse_temporal(s)
            .map(|dt| Value::String(iso_string(&dt)))
            .ok_or_else(|| Error::Validation(format!("'{s}' is not a valid date or time"))),
        RawValue::Temporal(dt) => Ok(Value::String(iso_string(dt))),
        RawValue::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| Value::String(iso_string(&dt.fixed_offset())))
            .ok_or_else(|| Error::Validation(format!("{n} is not a valid timestamp"))),
        RawValue::Bool(_) | RawValue::Array(_) | RawValue::Object(_) => Err(Error::Validation(
            "expected a date or time value".to_string(),
        )),
    }
}

fn normalize_number(raw: &RawValue, integer: bool) -> Result<Value> {
    let number = match raw {
        RawValue::Absent | RawValue::Null => 0.0,
        RawValue::Bool(b) => f64::from(u8::from(*b)),
        RawValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            n.as_f64().unwrap_or(0.0)
        }
        RawValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| Error::Validation(format!("'{s}' is not a number")))?
            }
        }
        RawValue::Temporal(dt) => dt.timestamp_millis() as f64,
        RawValue::Array(_) | RawValue::Object(_) => {
            return Err(Error::Validation("expected a number".to_string()));
        }
    };
    if integer && number.fract() != 0.0 {
        return Err(Error::Validation(format!("{number} is not a whole number")));
    }
    number_from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| Error::Validation("expected a finite number".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComponentType;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    fn field(field_type: FieldType) -> FieldDefinition {
        FieldDefinition::new(field_type)
    }

    fn date_field(component: ComponentType) -> FieldDefinition {
        let mut def = field(FieldType::string());
        def.table.component_type = Some(component);
        def
    }

    #[test]
    fn test_string_coercion() {
        let def = field(FieldType::string());
        assert_eq!(normalize(&RawValue::Absent, &def).unwrap(), json!(""));
        assert_eq!(normalize(&RawValue::Null, &def).unwrap(), json!(""));
        assert_eq!(normalize(&RawValue::from(42_i64), &def).unwrap(), json!("42"));
        assert_eq!(normalize(&RawValue::from(true), &def).unwrap(), json!("true"));
    }

    #[test]
    fn test_temporal_components_store_iso_strings() {
        let def = date_field(ComponentType::Date);
        let dt = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        assert_eq!(
            normalize(&RawValue::from(dt), &def).unwrap(),
            json!("2024-01-31T08:00:00.000Z")
        );
        assert_eq!(
            normalize(&RawValue::from("2024-01-31"), &def).unwrap(),
            json!("2024-01-31T00:00:00.000Z")
        );
        assert_eq!(normalize(&RawValue::Absent, &def).unwrap(), Value::Null);
        assert_eq!(normalize(&RawValue::from(""), &def).unwrap(), Value::Null);
        assert!(matches!(
            normalize(&RawValue::from("soon"), &def),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_number_coercion() {
        let def = field(FieldType::Number);
        assert_eq!(normalize(&RawValue::from(""), &def).unwrap(), json!(0));
        assert_eq!(normalize(&RawValue::from("30"), &def).unwrap(), json!(30));
        assert_eq!(normalize(&RawValue::from(" 2.5 "), &def).unwrap(), json!(2.5));
        assert!(matches!(
            normalize(&RawValue::from("abc"), &def),
            Err(Error::Validation(_))
        ));

        let def = field(FieldType::Integer);
        assert_eq!(normalize(&RawValue::from("30"), &def).unwrap(), json!(30));
        assert!(matches!(
            normalize(&RawValue::from("2.5"), &def),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_structured_types() {
        let def = field(FieldType::Array);
        assert_eq!(normalize(&RawValue::from("x"), &def).unwrap(), json!([]));
        assert_eq!(
            normalize(&RawValue::Array(vec![RawValue::Absent]), &def).unwrap(),
            json!([null])
        );

        let def = field(FieldType::Object);
        assert_eq!(normalize(&RawValue::Null, &def).unwrap(), json!({}));

        let def = field(FieldType::Boolean);
        assert_eq!(normalize(&RawValue::from(""), &def).unwrap(), json!(false));
        assert_eq!(normalize(&RawValue::from("no"), &def).unwrap(), json!(true));

        let def = field(FieldType::Other("geo".into()));
        assert_eq!(normalize(&RawValue::Absent, &def).unwrap(), Value::Null);
    }

    #[test]
    fn test_normalize_form_fills_defaults() {
        let schema = crate::schema::tests_support::contacts_schema();
        let mut values = FormValues::new();
        values.insert("age".to_string(), RawValue::from("30"));
        values.insert("stray".to_string(), RawValue::from("x"));

        let out = normalize_form(&schema, &values).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "", "age": 30}));
    }

    #[test]
    fn test_normalize_form_names_failing_field() {
        let schema = crate::schema::tests_support::contacts_schema();
        let mut values = FormValues::new();
        values.insert("age".to_string(), RawValue::from("thirty"));

        let err = normalize_form(&schema, &values).unwrap_err();
        assert!(err.to_string().contains("age"));
    }

    fn definition() -> impl Strategy<Value = FieldDefinition> {
        prop_oneof![
            Just(field(FieldType::string())),
            Just(date_field(ComponentType::DateTime)),
            Just(field(FieldType::Number)),
            Just(field(FieldType::Integer)),
            Just(field(FieldType::Boolean)),
            Just(field(FieldType::Array)),
            Just(field(FieldType::Object)),
            Just(field(FieldType::Other("any".into()))),
        ]
    }

    fn input() -> impl Strategy<Value = RawValue> {
        prop_oneof![
            Just(RawValue::Absent),
            Just(RawValue::Null),
            any::<bool>().prop_map(RawValue::Bool),
            (-1_000_000i64..1_000_000).prop_map(RawValue::from),
            (-1000.0f64..1000.0).prop_map(RawValue::from_f64),
            "[a-z0-9 ]{0,6}".prop_map(RawValue::String),
            (0i64..4_000_000_000_000)
                .prop_map(|ms| RawValue::from(Utc.timestamp_millis_opt(ms).unwrap())),
            prop::collection::vec(any::<bool>().prop_map(RawValue::Bool), 0..3)
                .prop_map(RawValue::Array),
        ]
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(def in definition(), raw in input()) {
            if let Ok(once) = normalize(&raw, &def) {
                let twice = normalize(&RawValue::from(&once), &def).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
