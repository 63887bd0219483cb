use std::collections::HashSet;

use chrono::Utc;
use serde_json::{Map, Value};

use super::projection::{all_fields, project};
use crate::error::{Error, Result};
use crate::types::{
    ComponentType, DynamicSource, FieldDefinition, FieldType, FixedEdge, OptionSource,
    SchemaDocument, SelectOption, TablePresentation, number_from_f64,
};
use crate::validation::validate_field_key;

// Every edit works on a copy; the input document is never touched, so a
// failed edit leaves nothing half-applied.

fn finish(mut schema: SchemaDocument) -> Result<SchemaDocument> {
    schema.restore_invariants();
    schema.version += 1;
    schema.updated_at = Some(Utc::now());
    Ok(schema)
}

fn set_required(required: &mut Vec<String>, key: &str, flag: bool) {
    let present = required.iter().any(|k| k == key);
    if flag && !present {
        required.push(key.to_string());
    } else if !flag && present {
        required.retain(|k| k != key);
    }
}

fn missing_field(key: &str) -> Error {
    Error::Validation(format!("Field '{key}' does not exist"))
}

/// Inserts or replaces the definition under `key` and sets its required
/// flag. The order hint is left alone; new fields fall in after the hinted
/// ones.
pub fn add_or_update_field(
    schema: &SchemaDocument,
    key: &str,
    def: FieldDefinition,
    required: bool,
) -> Result<SchemaDocument> {
    validate_field_key(key)?;
    let mut next = schema.clone();
    next.schema.properties.insert(key, def);
    set_required(&mut next.schema.required, key, required);
    finish(next)
}

/// Renames a field in place: the new key takes the old key's position, and
/// the required list, order hint and presentation hints follow it.
pub fn rename_field(
    schema: &SchemaDocument,
    old_key: &str,
    new_key: &str,
    def: FieldDefinition,
    required: bool,
) -> Result<SchemaDocument> {
    if old_key == new_key {
        return add_or_update_field(schema, new_key, def, required);
    }
    validate_field_key(new_key)?;
    if schema.fields().contains_key(new_key) {
        return Err(Error::Validation(format!("Field '{new_key}' already exists")));
    }

    let mut next = schema.clone();
    if !next.schema.properties.replace_key(old_key, new_key, def) {
        return Err(missing_field(old_key));
    }
    next.schema.required.retain(|k| k != old_key);
    set_required(&mut next.schema.required, new_key, required);
    for key in &mut next.ui.order {
        if key == old_key {
            *key = new_key.to_string();
        }
    }
    next.ui.hints = std::mem::take(&mut next.ui.hints)
        .into_iter()
        .map(|(k, v)| if k == old_key { (new_key.to_string(), v) } else { (k, v) })
        .collect();
    finish(next)
}

/// Removes a field and every reference to it.
pub fn delete_field(schema: &SchemaDocument, key: &str) -> Result<SchemaDocument> {
    let mut next = schema.clone();
    if next.schema.properties.remove(key).is_none() {
        return Err(missing_field(key));
    }
    next.schema.required.retain(|k| k != key);
    next.ui.order.retain(|k| k != key);
    next.ui.hints = std::mem::take(&mut next.ui.hints)
        .into_iter()
        .filter(|(k, _)| k != key)
        .collect();
    finish(next)
}

/// Replaces the order hint. Field definitions keep their own order.
pub fn reorder_fields(schema: &SchemaDocument, order: &[String]) -> Result<SchemaDocument> {
    let mut seen = HashSet::new();
    for key in order {
        if !schema.fields().contains_key(key) {
            return Err(missing_field(key));
        }
        if !seen.insert(key.as_str()) {
            return Err(Error::Validation(format!("Field '{key}' is listed twice")));
        }
    }
    let mut next = schema.clone();
    next.ui.order = order.to_vec();
    finish(next)
}

/// Option source as entered in the column editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OptionDraft {
    #[default]
    None,
    Static(Vec<SelectOption>),
    Dynamic {
        source_table: String,
        label_field: String,
        value_field: String,
    },
}

/// Column editor input, before it becomes a [`FieldDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
    pub key: String,
    pub title: String,
    pub type_name: String,
    pub format: Option<String>,
    pub required: bool,
    pub addable: bool,
    /// Default value as typed; converted to the declared type.
    pub default: Option<String>,
    pub width: Option<u32>,
    pub fixed: Option<FixedEdge>,
    pub ellipsis: bool,
    pub sortable: bool,
    pub filterable: bool,
    pub hidden: bool,
    pub component: ComponentType,
    pub options: OptionDraft,
    pub enum_values: Option<Vec<Value>>,
    pub extra: Map<String, Value>,
}

impl FieldDraft {
    /// A blank column: text, sortable, optional.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            type_name: "string".to_string(),
            format: None,
            required: false,
            addable: true,
            default: None,
            width: None,
            fixed: None,
            ellipsis: false,
            sortable: true,
            filterable: false,
            hidden: false,
            component: ComponentType::Text,
            options: OptionDraft::None,
            enum_values: None,
            extra: Map::new(),
        }
    }

    /// Pre-fills the editor from an existing field.
    #[must_use]
    pub fn from_definition(key: &str, def: &FieldDefinition, required: bool) -> Self {
        let options = match &def.options {
            Some(OptionSource::Static(values)) => OptionDraft::Static(values.clone()),
            Some(OptionSource::Dynamic(source)) => OptionDraft::Dynamic {
                source_table: source.source_record_type.clone(),
                label_field: source.label_field.clone(),
                value_field: source.value_field.clone(),
            },
            None => OptionDraft::None,
        };
        Self {
            key: key.to_string(),
            title: def.display_title(key).to_string(),
            type_name: def.field_type.type_name().to_string(),
            format: def.field_type.format().map(|f| f.as_str().to_string()),
            required,
            addable: def.addable,
            default: def.default.as_ref().map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            width: def.table.width,
            fixed: def.table.fixed,
            ellipsis: def.table.ellipsis,
            sortable: def.table.sortable,
            filterable: def.table.filterable,
            hidden: def.table.hidden,
            component: def.component(),
            options,
            enum_values: def.enum_values.clone(),
            extra: def.extra.clone(),
        }
    }

    pub fn into_definition(self) -> Result<FieldDefinition> {
        let field_type = FieldType::parse(&self.type_name, self.format.as_deref().filter(|f| !f.is_empty()));
        let default = match self.default.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => default_value(&field_type, text)?,
        };
        let options = if self.component.uses_options() {
            match self.options {
                OptionDraft::None => None,
                OptionDraft::Static(values) => Some(OptionSource::Static(values)),
                OptionDraft::Dynamic {
                    source_table,
                    label_field,
                    value_field,
                } => {
                    if source_table.is_empty() || label_field.is_empty() || value_field.is_empty() {
                        return Err(Error::Validation(
                            "A dynamic option source needs a table, a label field and a value field"
                                .to_string(),
                        ));
                    }
                    Some(OptionSource::Dynamic(DynamicSource {
                        source_record_type: source_table,
                        label_field,
                        value_field,
                    }))
                }
            }
        } else {
            None
        };
        Ok(FieldDefinition {
            field_type,
            title: (!self.title.is_empty()).then_some(self.title),
            addable: self.addable,
            default,
            enum_values: self.enum_values,
            table: TablePresentation {
                width: self.width,
                fixed: self.fixed,
                ellipsis: self.ellipsis,
                sortable: self.sortable,
                filterable: self.filterable,
                hidden: self.hidden,
                order: None,
                component_type: Some(self.component),
            },
            options,
            extra: self.extra,
        })
    }
}

fn default_value(field_type: &FieldType, text: &str) -> Result<Option<Value>> {
    let value = match field_type {
        FieldType::Number | FieldType::Integer => {
            let number = text
                .parse::<f64>()
                .ok()
                .and_then(number_from_f64)
                .ok_or_else(|| Error::Validation(format!("Default '{text}' is not a number")))?;
            if matches!(field_type, FieldType::Integer) && number.as_i64().is_none() {
                return Err(Error::Validation(format!(
                    "Default '{text}' is not a whole number"
                )));
            }
            Value::Number(number)
        }
        FieldType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => {
                return Err(Error::Validation(format!(
                    "Default '{text}' is not true or false"
                )));
            }
        },
        FieldType::Array | FieldType::Object => return Ok(None),
        FieldType::String { .. } | FieldType::Other(_) => Value::String(text.to_string()),
    };
    Ok(Some(value))
}

/// Applies a column editor submission: an add when `original_key` is
/// `None`, otherwise an update or rename of that field.
pub fn apply_draft(
    schema: &SchemaDocument,
    original_key: Option<&str>,
    draft: FieldDraft,
) -> Result<SchemaDocument> {
    let key = draft.key.clone();
    let required = draft.required;
    if original_key.is_none() && schema.fields().contains_key(&key) {
        return Err(Error::Validation(format!("Field '{key}' already exists")));
    }
    let def = draft.into_definition()?;
    match original_key {
        Some(old) => rename_field(schema, old, &key, def, required),
        None => add_or_update_field(schema, &key, def, required),
    }
}

/// One row of the schema manager's column listing.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldSummary {
    pub key: String,
    pub title: String,
    pub field_type: String,
    pub component: &'static str,
    pub required: bool,
    pub hidden: bool,
    pub addable: bool,
}

/// Every field, hidden ones included, in display order.
#[must_use]
pub fn field_listing(schema: &SchemaDocument) -> Vec<FieldSummary> {
    project(schema.fields(), &schema.ui.order, all_fields)
        .into_iter()
        .filter_map(|key| {
            let def = schema.field(&key)?;
            Some(FieldSummary {
                title: def.display_title(&key).to_string(),
                field_type: def.field_type.to_string(),
                component: def.component().as_str(),
                required: schema.is_required(&key),
                hidden: def.table.hidden,
                addable: def.addable,
                key,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::projection::grid_visible;
    use crate::schema::tests_support::contacts_schema;
    use proptest::prelude::*;
    use serde_json::json;

    fn text_field() -> FieldDefinition {
        FieldDefinition::new(FieldType::string())
    }

    #[test]
    fn test_add_field_bumps_version_and_keeps_hint() {
        let schema = contacts_schema();
        let next = add_or_update_field(&schema, "email", text_field(), true).unwrap();

        assert_eq!(next.version, schema.version + 1);
        assert!(next.updated_at.is_some());
        assert!(next.is_required("email"));
        assert_eq!(next.ui.order, vec!["age"]);
        assert_eq!(next.grid_keys(), vec!["age", "name", "email"]);
        // The input is untouched.
        assert!(schema.field("email").is_none());
    }

    #[test]
    fn test_update_clears_required_flag() {
        let schema = contacts_schema();
        let next = add_or_update_field(&schema, "name", text_field(), false).unwrap();
        assert!(!next.is_required("name"));
    }

    #[test]
    fn test_rename_rewrites_every_reference() {
        let mut schema = contacts_schema();
        schema.ui.order = vec!["name".to_string(), "age".to_string()];
        schema
            .ui
            .hints
            .insert("name".to_string(), json!({"ui:autofocus": true}));

        let next = rename_field(&schema, "name", "fullName", text_field(), true).unwrap();

        assert_eq!(next.fields().keys().collect::<Vec<_>>(), vec!["fullName", "age"]);
        assert_eq!(next.schema.required, vec!["fullName"]);
        assert_eq!(next.ui.order, vec!["fullName", "age"]);
        assert!(next.ui.hints.contains_key("fullName"));
        assert!(!next.ui.hints.contains_key("name"));
    }

    #[test]
    fn test_rename_onto_existing_key_fails_without_changes() {
        let schema = contacts_schema();
        let err = rename_field(&schema, "name", "age", text_field(), false).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = rename_field(&schema, "ghost", "other", text_field(), false).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rename_to_same_key_is_an_update() {
        let schema = contacts_schema();
        let next = rename_field(&schema, "age", "age", FieldDefinition::new(FieldType::Number), false)
            .unwrap();
        assert_eq!(next.field("age").unwrap().field_type, FieldType::Number);
    }

    #[test]
    fn test_delete_field_removes_references() {
        let schema = contacts_schema();
        let next = delete_field(&schema, "age").unwrap();
        assert!(next.field("age").is_none());
        assert!(next.ui.order.is_empty());
        assert_eq!(next.schema.required, vec!["name"]);

        let next = delete_field(&next, "name").unwrap();
        assert!(next.schema.required.is_empty());
        assert!(delete_field(&next, "name").is_err());
    }

    #[test]
    fn test_edits_drop_stale_hint_keys() {
        let mut schema = contacts_schema();
        schema.ui.order = vec!["age".to_string(), "ghost".to_string()];
        schema.schema.required.push("ghost".to_string());
        assert_eq!(schema.grid_keys(), vec!["age", "name"]);

        let next = delete_field(&schema, "age").unwrap();
        assert!(next.ui.order.is_empty());
        assert_eq!(next.schema.required, vec!["name"]);
        assert_eq!(next.version, schema.version + 1);

        let next = add_or_update_field(&schema, "email", text_field(), false).unwrap();
        assert_eq!(next.ui.order, vec!["age"]);
        assert_eq!(next.schema.required, vec!["name"]);
    }

    #[test]
    fn test_reorder_validates_keys() {
        let schema = contacts_schema();
        let next = reorder_fields(&schema, &["name".to_string(), "age".to_string()]).unwrap();
        assert_eq!(next.grid_keys(), vec!["name", "age"]);
        // Definitions keep their own order.
        assert_eq!(next.fields().keys().collect::<Vec<_>>(), vec!["name", "age"]);

        assert!(reorder_fields(&schema, &["ghost".to_string()]).is_err());
        assert!(reorder_fields(&schema, &["age".to_string(), "age".to_string()]).is_err());
    }

    #[test]
    fn test_draft_converts_defaults_and_options() {
        let mut draft = FieldDraft::new("priority");
        draft.type_name = "integer".to_string();
        draft.default = Some("3".to_string());
        draft.component = ComponentType::Dropdown;
        draft.options = OptionDraft::Static(vec![SelectOption::new("Low", 1)]);
        let def = draft.clone().into_definition().unwrap();
        assert_eq!(def.default, Some(json!(3)));
        assert!(matches!(def.options, Some(OptionSource::Static(_))));

        draft.component = ComponentType::Text;
        let def = draft.clone().into_definition().unwrap();
        assert!(def.options.is_none());

        draft.default = Some("3.5".to_string());
        assert!(draft.into_definition().is_err());
    }

    #[test]
    fn test_draft_round_trips_through_definition() {
        let schema = contacts_schema();
        let def = schema.field("name").unwrap();
        let draft = FieldDraft::from_definition("name", def, true);
        assert!(draft.required);
        let rebuilt = draft.into_definition().unwrap();
        assert_eq!(rebuilt.field_type, def.field_type);
        assert_eq!(rebuilt.title, def.title);
    }

    #[test]
    fn test_apply_draft_rejects_duplicate_add() {
        let schema = contacts_schema();
        let err = apply_draft(&schema, None, FieldDraft::new("name")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let next = apply_draft(&schema, Some("name"), FieldDraft::new("label")).unwrap();
        assert_eq!(next.fields().keys().collect::<Vec<_>>(), vec!["label", "age"]);
    }

    #[test]
    fn test_field_listing_includes_hidden() {
        let mut schema = contacts_schema();
        let mut name = schema.field("name").unwrap().clone();
        name.table.hidden = true;
        schema.schema.properties.insert("name", name);

        let listing = field_listing(&schema);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].key, "age");
        assert!(listing[1].hidden);
        assert!(listing[1].required);
        assert_eq!(listing[0].field_type, "integer");
    }

    proptest! {
        #[test]
        fn prop_rename_keeps_projected_position(index in 0usize..2, hinted in any::<bool>()) {
            let mut schema = contacts_schema();
            if !hinted {
                schema.ui.order.clear();
            }
            let before = schema.grid_keys();
            let old_key = before[index].clone();
            let def = schema.field(&old_key).unwrap().clone();

            let next = rename_field(&schema, &old_key, "renamed", def, false).unwrap();
            let after = project(next.fields(), &next.ui.order, grid_visible);

            let mut expected = before.clone();
            expected[index] = "renamed".to_string();
            prop_assert_eq!(after, expected);
        }
    }
}
