use std::path::Path;

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::types::{TableSchema, UiSchema};

/// Text format of an authored schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Json,
    Yaml,
}

impl TextFormat {
    /// `.yaml`/`.yml` files are YAML; everything else is read as JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => TextFormat::Yaml,
            _ => TextFormat::Json,
        }
    }
}

pub fn parse_value(text: &str, format: TextFormat) -> Result<Value> {
    let value = match format {
        TextFormat::Json => serde_json::from_str(text)?,
        TextFormat::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(value)
}

/// Parses a schema body as typed by an operator. Malformed text is a parse
/// error; well-formed text of the wrong shape is a structural error.
pub fn parse_schema_text(text: &str, format: TextFormat) -> Result<TableSchema> {
    TableSchema::from_value(parse_value(text, format)?)
}

/// Parses a presentation overlay. Blank text is an empty overlay.
pub fn parse_ui_text(text: &str, format: TextFormat) -> Result<UiSchema> {
    if text.trim().is_empty() {
        return Ok(UiSchema::default());
    }
    UiSchema::from_value(parse_value(text, format)?)
}

/// A schema file as accepted by import: either a bare schema body or an
/// envelope `{title, schema, uiSchema}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFile {
    pub title: Option<String>,
    pub schema: TableSchema,
    pub ui: UiSchema,
}

pub fn parse_schema_file(text: &str, format: TextFormat) -> Result<SchemaFile> {
    let value = parse_value(text, format)?;
    let Value::Object(mut map) = value else {
        return Err(Error::StructuralInvariant(
            "schema file must contain a mapping".to_string(),
        ));
    };
    if map.contains_key("properties") {
        return Ok(SchemaFile {
            title: None,
            schema: TableSchema::from_value(Value::Object(map))?,
            ui: UiSchema::default(),
        });
    }
    let schema = map.remove("schema").ok_or_else(|| {
        Error::StructuralInvariant("schema file has neither \"properties\" nor \"schema\"".to_string())
    })?;
    let title = match map.remove("title") {
        Some(Value::String(title)) if !title.is_empty() => Some(title),
        _ => None,
    };
    Ok(SchemaFile {
        title,
        schema: TableSchema::from_value(schema)?,
        ui: UiSchema::from_value(map.remove("uiSchema").unwrap_or(Value::Null))?,
    })
}

/// Starting point for a new record type: a small contact-style schema.
#[must_use]
pub fn template() -> (TableSchema, UiSchema) {
    let schema = json!({
        "type": "object",
        "required": [],
        "properties": {
            "name": {
                "type": "string",
                "title": "Name",
                "tableOptions": {"width": 150, "sortable": true, "filterable": true}
            },
            "email": {
                "type": "string",
                "format": "email",
                "title": "Email",
                "tableOptions": {"width": 200, "sortable": true, "filterable": true}
            },
            "phone": {
                "type": "string",
                "title": "Phone",
                "tableOptions": {"width": 120, "sortable": true}
            },
            "isActive": {
                "type": "boolean",
                "title": "Active",
                "default": true,
                "tableOptions": {"width": 80, "sortable": true, "filterable": true}
            }
        }
    });
    let ui = json!({
        "ui:order": ["name", "email", "phone", "isActive"],
        "name": {"ui:placeholder": "Full name", "ui:autofocus": true},
        "email": {"ui:placeholder": "example@domain.com"},
        "phone": {"ui:placeholder": "050-0000000"}
    });
    // Both literals are well-formed; fall back to empty parts rather than panic.
    (
        TableSchema::from_value(schema).unwrap_or_default(),
        UiSchema::from_value(ui).unwrap_or_default(),
    )
}
