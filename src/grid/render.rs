use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::i18n::Locale;
use crate::schema::options::{label_for, static_options};
use crate::types::{ComponentType, FieldDefinition, FieldType, SchemaDocument, SelectOption, display_value, parse_temporal};

/// Placeholder for empty or unrenderable cells.
pub const EMPTY_CELL: &str = "-";

/// Resolved options per field, used to show labels instead of raw values.
#[derive(Debug, Clone, Default)]
pub struct OptionLookup {
    options: HashMap<String, Vec<SelectOption>>,
}

impl OptionLookup {
    /// Seeds the lookup with every option list that needs no store access.
    #[must_use]
    pub fn from_schema(schema: &SchemaDocument) -> Self {
        let options = schema
            .fields()
            .iter()
            .filter_map(|(key, def)| static_options(def).map(|opts| (key.to_string(), opts)))
            .collect();
        Self { options }
    }

    pub fn insert(&mut self, key: impl Into<String>, options: Vec<SelectOption>) {
        self.options.insert(key.into(), options);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[SelectOption]> {
        self.options.get(key).map(Vec::as_slice)
    }
}

fn temporal(value: &Value) -> Result<Option<DateTime<Utc>>> {
    match value {
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => parse_temporal(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .ok_or_else(|| Error::Parse(format!("'{s}' is not a date"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| Error::Parse(format!("{n} is not a timestamp"))),
        Value::Bool(false) => Ok(None),
        other => Err(Error::Parse(format!("{other} is not a date"))),
    }
}

/// Display text of a stored cell value.
///
/// Fails only for temporal cells whose value cannot be read as a date;
/// callers show [`EMPTY_CELL`] in that case.
pub fn render_cell(
    value: Option<&Value>,
    def: &FieldDefinition,
    options: Option<&[SelectOption]>,
    locale: Locale,
) -> Result<String> {
    let value = match value {
        None | Some(Value::Null) => return Ok(EMPTY_CELL.to_string()),
        Some(value) => value,
    };
    let messages = locale.messages();
    let component = def.component();
    if component == ComponentType::Checkbox || def.field_type == FieldType::Boolean {
        let truthy = crate::types::RawValue::from(value).is_truthy();
        return Ok(locale.yes_no(truthy).to_string());
    }
    let format = match component {
        ComponentType::Date => Some(messages.date_format),
        ComponentType::Time => Some(messages.time_format),
        ComponentType::DateTime => Some(messages.datetime_format),
        _ => None,
    };
    if let Some(format) = format {
        return Ok(match temporal(value)? {
            Some(dt) => dt.format(format).to_string(),
            None => EMPTY_CELL.to_string(),
        });
    }
    if component.uses_options()
        && let Some(label) = options.and_then(|opts| label_for(opts, value))
    {
        return Ok(label.to_string());
    }
    Ok(display_value(value))
}

/// [`render_cell`] with the failure folded into the placeholder.
#[must_use]
pub fn render_cell_or_placeholder(
    value: Option<&Value>,
    def: &FieldDefinition,
    options: Option<&[SelectOption]>,
    locale: Locale,
) -> String {
    render_cell(value, def, options, locale).unwrap_or_else(|e| {
        tracing::debug!("Rendering placeholder for unreadable cell: {}", e);
        EMPTY_CELL.to_string()
    })
}
