use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::value::{format_timestamp, parse_timestamp};
use crate::error::{Error, Result};
use crate::store::Document;

/// Semantic subtype of a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uri,
    Date,
    Time,
    DateTime,
    Password,
    Phone,
    Other(String),
}

impl StringFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "email" => StringFormat::Email,
            "uri" => StringFormat::Uri,
            "date" => StringFormat::Date,
            "time" => StringFormat::Time,
            "date-time" => StringFormat::DateTime,
            "password" => StringFormat::Password,
            "phone" | "tel" => StringFormat::Phone,
            other => StringFormat::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::DateTime => "date-time",
            StringFormat::Password => "password",
            StringFormat::Phone => "phone",
            StringFormat::Other(s) => s,
        }
    }
}

/// Declared value type of a field. Only strings carry a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String { format: Option<StringFormat> },
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// A type name this crate does not interpret; kept for round-tripping.
    Other(String),
}

impl FieldType {
    #[must_use]
    pub fn string() -> Self {
        FieldType::String { format: None }
    }

    #[must_use]
    pub fn parse(type_name: &str, format: Option<&str>) -> Self {
        match type_name {
            "string" => FieldType::String {
                format: format.map(StringFormat::parse),
            },
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            other => FieldType::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::String { .. } => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Other(name) => name,
        }
    }

    #[must_use]
    pub fn format(&self) -> Option<&StringFormat> {
        match self {
            FieldType::String { format } => format.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Integer)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            Some(format) => write!(f, "{} ({})", self.type_name(), format.as_str()),
            None => write!(f, "{}", self.type_name()),
        }
    }
}

/// Editing widget for a field, independent of its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentType {
    #[default]
    Text,
    Number,
    Dropdown,
    Checkbox,
    Date,
    Time,
    DateTime,
    Email,
    Phone,
    Url,
    Password,
    TextArea,
    Radio,
    File,
    Image,
}

impl ComponentType {
    pub const ALL: [ComponentType; 15] = [
        ComponentType::Text,
        ComponentType::Number,
        ComponentType::Dropdown,
        ComponentType::Checkbox,
        ComponentType::Date,
        ComponentType::Time,
        ComponentType::DateTime,
        ComponentType::Email,
        ComponentType::Phone,
        ComponentType::Url,
        ComponentType::Password,
        ComponentType::TextArea,
        ComponentType::Radio,
        ComponentType::File,
        ComponentType::Image,
    ];

    /// Unknown names fall back to a plain text editor.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "number" => ComponentType::Number,
            "dropdown" => ComponentType::Dropdown,
            "checkbox" | "boolean" => ComponentType::Checkbox,
            "date" => ComponentType::Date,
            "time" => ComponentType::Time,
            "datetime" => ComponentType::DateTime,
            "email" => ComponentType::Email,
            "phone" | "tel" => ComponentType::Phone,
            "url" => ComponentType::Url,
            "password" => ComponentType::Password,
            "textarea" => ComponentType::TextArea,
            "radio" => ComponentType::Radio,
            "file" => ComponentType::File,
            "image" => ComponentType::Image,
            _ => ComponentType::Text,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Text => "text",
            ComponentType::Number => "number",
            ComponentType::Dropdown => "dropdown",
            ComponentType::Checkbox => "checkbox",
            ComponentType::Date => "date",
            ComponentType::Time => "time",
            ComponentType::DateTime => "datetime",
            ComponentType::Email => "email",
            ComponentType::Phone => "phone",
            ComponentType::Url => "url",
            ComponentType::Password => "password",
            ComponentType::TextArea => "textarea",
            ComponentType::Radio => "radio",
            ComponentType::File => "file",
            ComponentType::Image => "image",
        }
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ComponentType::Date | ComponentType::Time | ComponentType::DateTime
        )
    }

    /// Whether the widget picks from an option list.
    #[must_use]
    pub fn uses_options(self) -> bool {
        matches!(self, ComponentType::Dropdown | ComponentType::Radio)
    }
}

impl Serialize for ComponentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ComponentType::parse(&name))
    }
}

/// Grid edge a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedEdge {
    Left,
    Right,
}

mod fixed_edge {
    use super::FixedEdge;
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Flag(bool),
        Edge(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<FixedEdge>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(FixedEdge::Left) => serializer.serialize_str("left"),
            Some(FixedEdge::Right) => serializer.serialize_str("right"),
            None => serializer.serialize_none(),
        }
    }

    // `true` pins to the leading edge.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FixedEdge>, D::Error> {
        match Option::<Wire>::deserialize(deserializer)? {
            None | Some(Wire::Flag(false)) => Ok(None),
            Some(Wire::Flag(true)) => Ok(Some(FixedEdge::Left)),
            Some(Wire::Edge(edge)) => match edge.as_str() {
                "left" => Ok(Some(FixedEdge::Left)),
                "right" => Ok(Some(FixedEdge::Right)),
                other => Err(de::Error::custom(format!("invalid fixed edge: {other}"))),
            },
        }
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-field grid presentation (`tableOptions` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "fixed_edge")]
    pub fixed: Option<FixedEdge>,
    #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
    pub ellipsis: bool,
    #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
    pub sortable: bool,
    #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
    pub filterable: bool,
    #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Legacy numeric ordering; superseded by the order hint and unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Options drawn live from another record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSource {
    pub source_record_type: String,
    pub label_field: String,
    pub value_field: String,
}

/// Declared option list of a dropdown or radio field, besides `enum`.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    Static(Vec<SelectOption>),
    Dynamic(DynamicSource),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropdownWire {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_field: Option<String>,
}

impl DropdownWire {
    fn into_source(self) -> Option<OptionSource> {
        if let Some(values) = self.values {
            return Some(OptionSource::Static(values));
        }
        match (self.source_table, self.label_field, self.value_field) {
            (Some(source_record_type), Some(label_field), Some(value_field))
                if !source_record_type.is_empty() =>
            {
                Some(OptionSource::Dynamic(DynamicSource {
                    source_record_type,
                    label_field,
                    value_field,
                }))
            }
            _ => None,
        }
    }
}

impl From<OptionSource> for DropdownWire {
    fn from(source: OptionSource) -> Self {
        match source {
            OptionSource::Static(values) => DropdownWire {
                kind: Some("static".to_string()),
                values: Some(values),
                ..DropdownWire::default()
            },
            OptionSource::Dynamic(dynamic) => DropdownWire {
                kind: Some("dynamic".to_string()),
                source_table: Some(dynamic.source_record_type),
                label_field: Some(dynamic.label_field),
                value_field: Some(dynamic.value_field),
                ..DropdownWire::default()
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldWire {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    addable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table_options: Option<TablePresentation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dropdown_options: Option<DropdownWire>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// One field of a record type: value type, presentation and option source.
///
/// On the wire this is a JSON Schema property extended with `addable`,
/// `tableOptions` and `dropdownOptions`. Keywords this crate does not
/// interpret (`minLength`, `description`, ...) are kept in `extra` for the
/// form renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FieldWire", into = "FieldWire")]
pub struct FieldDefinition {
    pub field_type: FieldType,
    pub title: Option<String>,
    pub addable: bool,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub table: TablePresentation,
    pub options: Option<OptionSource>,
    pub extra: Map<String, Value>,
}

impl From<FieldWire> for FieldDefinition {
    fn from(wire: FieldWire) -> Self {
        let type_name = wire.type_name.unwrap_or_default();
        let field_type = FieldType::parse(&type_name, wire.format.as_deref());
        let mut extra = wire.extra;
        if let Some(format) = wire.format
            && !matches!(field_type, FieldType::String { .. })
        {
            extra.insert("format".to_string(), Value::String(format));
        }
        Self {
            field_type,
            title: wire.title,
            addable: wire.addable.unwrap_or(true),
            default: wire.default,
            enum_values: wire.enum_values,
            table: wire.table_options.unwrap_or_default(),
            options: wire.dropdown_options.and_then(DropdownWire::into_source),
            extra,
        }
    }
}

impl From<FieldDefinition> for FieldWire {
    fn from(def: FieldDefinition) -> Self {
        let type_name = def.field_type.type_name().to_string();
        Self {
            type_name: (!type_name.is_empty()).then_some(type_name),
            format: def.field_type.format().map(|f| f.as_str().to_string()),
            title: def.title,
            addable: (!def.addable).then_some(false),
            default: def.default,
            enum_values: def.enum_values,
            table_options: (def.table != TablePresentation::default()).then_some(def.table),
            dropdown_options: def.options.map(DropdownWire::from),
            extra: def.extra,
        }
    }
}

/// The option source that is in effect for a field, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectiveOptions<'a> {
    Inline(&'a [Value]),
    Static(&'a [SelectOption]),
    Dynamic(&'a DynamicSource),
    None,
}

impl FieldDefinition {
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            title: None,
            addable: true,
            default: None,
            enum_values: None,
            table: TablePresentation::default(),
            options: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn component(&self) -> ComponentType {
        self.table.component_type.unwrap_or_default()
    }

    /// Title shown in grid headers and exports; falls back to the key.
    #[must_use]
    pub fn display_title<'a>(&'a self, key: &'a str) -> &'a str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => key,
        }
    }

    #[must_use]
    pub fn effective_options(&self) -> EffectiveOptions<'_> {
        if let Some(values) = &self.enum_values {
            return EffectiveOptions::Inline(values);
        }
        match &self.options {
            Some(OptionSource::Static(values)) => EffectiveOptions::Static(values),
            Some(OptionSource::Dynamic(dynamic)) => EffectiveOptions::Dynamic(dynamic),
            None => EffectiveOptions::None,
        }
    }
}

/// Field definitions keyed by field key, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldDefinition)>,
}

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, def)| def)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.entries.iter().map(|(k, def)| (k.as_str(), def))
    }

    /// Replaces an existing definition in place, or appends a new one.
    pub fn insert(&mut self, key: impl Into<String>, def: FieldDefinition) {
        let key = key.into();
        match self.position(&key) {
            Some(index) => self.entries[index].1 = def,
            None => self.entries.push((key, def)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldDefinition> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    /// Swaps the entry at `old_key` for `new_key`/`def` at the same position.
    /// Returns false if `old_key` is not present.
    pub fn replace_key(&mut self, old_key: &str, new_key: impl Into<String>, def: FieldDefinition) -> bool {
        match self.position(old_key) {
            Some(index) => {
                self.entries[index] = (new_key.into(), def);
                true
            }
            None => false,
        }
    }
}

impl FromIterator<(String, FieldDefinition)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldDefinition)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (key, def) in iter {
            map.insert(key, def);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, def) in &self.entries {
            map.serialize_entry(key, def)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<FieldMap, A::Error> {
                let mut map = FieldMap::new();
                while let Some((key, def)) = access.next_entry::<String, FieldDefinition>()? {
                    map.insert(key, def);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// The JSON Schema envelope of a record type: `{type: "object", required,
/// properties}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    pub properties: FieldMap,
    pub required: Vec<String>,
    /// Other top-level keywords, passed through to the form renderer.
    pub extra: Map<String, Value>,
}

impl TableSchema {
    /// Reads a schema, enforcing the structural rules: an object of type
    /// `"object"` with a `properties` mapping.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::StructuralInvariant(
                "schema must be a JSON object".to_string(),
            ));
        };
        match map.get("type") {
            Some(Value::String(kind)) if kind == "object" => {}
            _ => {
                return Err(Error::StructuralInvariant(
                    "schema type must be \"object\"".to_string(),
                ));
            }
        }
        let properties = match map.remove("properties") {
            Some(value @ Value::Object(_)) => serde_json::from_value::<FieldMap>(value)?,
            _ => {
                return Err(Error::StructuralInvariant(
                    "schema is missing \"properties\"".to_string(),
                ));
            }
        };
        let required = match map.remove("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)?,
        };
        map.remove("type");
        Ok(Self {
            properties,
            required,
            extra: map,
        })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String("object".to_string()));
        map.insert(
            "required".to_string(),
            Value::Array(self.required.iter().cloned().map(Value::String).collect()),
        );
        map.insert("properties".to_string(), properties_value(self.properties.iter()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

pub(crate) fn properties_value<'a>(fields: impl Iterator<Item = (&'a str, &'a FieldDefinition)>) -> Value {
    let mut props = Map::new();
    for (key, def) in fields {
        // FieldDefinition serialization is infallible: every member is plain data.
        if let Ok(value) = serde_json::to_value(def) {
            props.insert(key.to_string(), value);
        }
    }
    Value::Object(props)
}

/// The presentation overlay (`uiSchema` on the wire): the order hint under
/// `ui:order` plus per-field directives for the form renderer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiSchema {
    pub order: Vec<String>,
    pub hints: Map<String, Value>,
}

impl UiSchema {
    pub const ORDER_KEY: &'static str = "ui:order";

    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => {
                return Err(Error::Parse(
                    "ui overlay must be a JSON object".to_string(),
                ));
            }
        };
        let order = match map.remove(Self::ORDER_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<String>>(value)
                .map_err(|e| Error::Parse(format!("{} must be a list of field keys: {e}", Self::ORDER_KEY)))?,
        };
        Ok(Self { order, hints: map })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.order.is_empty() {
            map.insert(
                Self::ORDER_KEY.to_string(),
                Value::Array(self.order.iter().cloned().map(Value::String).collect()),
            );
        }
        for (key, value) in &self.hints {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaWire {
    table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    schema: Value,
    #[serde(default)]
    ui_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<Value>,
    #[serde(default)]
    version: Option<u64>,
}

/// Declarative description of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub id: String,
    /// Collection this schema governs (`tableName` on the wire).
    pub record_type: String,
    pub title: String,
    pub schema: TableSchema,
    pub ui: UiSchema,
    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SchemaDocument {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let wire: SchemaWire = serde_json::from_value(Value::Object(doc.data.clone()))?;
        let schema = TableSchema::from_value(wire.schema)?;
        let ui = UiSchema::from_value(wire.ui_schema)?;
        let title = match wire.title {
            Some(title) if !title.is_empty() => title,
            _ => wire.table_name.clone(),
        };
        Ok(Self {
            id: doc.id.clone(),
            record_type: wire.table_name,
            title,
            schema,
            ui,
            version: wire.version.unwrap_or(0),
            created_at: wire.created_at.as_ref().and_then(parse_timestamp),
            updated_at: wire.updated_at.as_ref().and_then(parse_timestamp),
        })
    }

    /// Document body as persisted (the id lives outside the body).
    #[must_use]
    pub fn to_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("tableName".to_string(), Value::String(self.record_type.clone()));
        map.insert("title".to_string(), Value::String(self.title.clone()));
        map.insert("schema".to_string(), self.schema.to_value());
        map.insert("uiSchema".to_string(), self.ui.to_value());
        if let Some(created_at) = &self.created_at {
            map.insert("createdAt".to_string(), Value::String(format_timestamp(created_at)));
        }
        if let Some(updated_at) = &self.updated_at {
            map.insert("updatedAt".to_string(), Value::String(format_timestamp(updated_at)));
        }
        map.insert("version".to_string(), Value::from(self.version));
        map
    }

    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.schema.properties
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.schema.properties.get(key)
    }

    #[must_use]
    pub fn is_required(&self, key: &str) -> bool {
        self.schema.required.iter().any(|k| k == key)
    }

    /// Display title of a field, or the key itself for unknown keys.
    #[must_use]
    pub fn title_of(&self, key: &str) -> String {
        self.field(key)
            .map_or(key, |def| def.display_title(key))
            .to_string()
    }

    /// Drops required and order-hint keys that name no defined field, and
    /// repeated keys. Documents written by other editors may carry such
    /// stale keys; every write goes through here first.
    pub fn restore_invariants(&mut self) {
        let properties = &self.schema.properties;
        let record_type = &self.record_type;
        let prune = |keys: &mut Vec<String>, what: &str| {
            let mut seen = std::collections::HashSet::new();
            keys.retain(|key| {
                if !properties.contains_key(key) {
                    tracing::warn!("Dropping undefined {} key '{}' from '{}'", what, key, record_type);
                    return false;
                }
                seen.insert(key.clone())
            });
        };
        prune(&mut self.schema.required, "required");
        prune(&mut self.ui.order, "ui:order");
    }
}
