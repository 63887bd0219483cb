use serde::Serialize;
use serde_json::{Map, Value};

use super::write::{validate_required, write_create, write_update};
use crate::error::Result;
use crate::i18n::Locale;
use crate::store::DocumentStore;
use crate::types::{FormValues, RawValue, Record, SchemaDocument, UiSchema, properties_value};

/// What a submitted full form writes.
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Edit(Box<Record>),
}

/// Schema handed to the form renderer: addable fields only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub schema: Value,
    pub ui_schema: Value,
}

/// A full-form dialog for creating or editing one record.
///
/// The session stays usable after a failed submit so the operator can fix
/// the input and try again.
#[derive(Debug, Clone)]
pub struct FormSession {
    schema: SchemaDocument,
    mode: FormMode,
    data: FormValues,
    locale: Locale,
}

impl FormSession {
    /// New-record form, pre-filled with the declared field defaults.
    #[must_use]
    pub fn open_create(schema: &SchemaDocument, locale: Locale) -> Self {
        let data = schema
            .form_keys()
            .into_iter()
            .filter_map(|key| {
                let default = schema.field(&key)?.default.clone()?;
                Some((key, RawValue::from(default)))
            })
            .collect();
        Self {
            schema: schema.clone(),
            mode: FormMode::Create,
            data,
            locale,
        }
    }

    #[must_use]
    pub fn open_edit(schema: &SchemaDocument, record: &Record, locale: Locale) -> Self {
        let mut session = Self {
            schema: schema.clone(),
            mode: FormMode::Edit(Box::new(record.clone())),
            data: FormValues::new(),
            locale,
        };
        session.on_change(record.values());
        session
    }

    #[must_use]
    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// Current draft, limited to the form's fields.
    #[must_use]
    pub fn data(&self) -> &FormValues {
        &self.data
    }

    pub fn form_schema(&self) -> FormSchema {
        let keys = self.schema.form_keys();
        let fields = keys
            .iter()
            .filter_map(|key| self.schema.field(key).map(|def| (key.as_str(), def)));
        let mut properties = properties_value(fields);
        if let Value::Object(props) = &mut properties {
            for def in props.values_mut() {
                if let Value::Object(def) = def {
                    def.remove("tableOptions");
                }
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert(
            "required".to_string(),
            Value::Array(
                self.schema
                    .schema
                    .required
                    .iter()
                    .filter(|key| keys.contains(key))
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        schema.insert("properties".to_string(), properties);
        for (key, value) in &self.schema.schema.extra {
            schema.insert(key.clone(), value.clone());
        }

        let ui = UiSchema {
            order: self
                .schema
                .ui
                .order
                .iter()
                .filter(|key| keys.contains(key))
                .cloned()
                .collect(),
            hints: self.schema.ui.hints.clone(),
        };
        FormSchema {
            schema: Value::Object(schema),
            ui_schema: ui.to_value(),
        }
    }

    /// Takes a change event from the renderer. Keys outside the form's
    /// fields are dropped.
    pub fn on_change(&mut self, data: FormValues) {
        let keys = self.schema.form_keys();
        self.data = data
            .into_iter()
            .filter(|(key, _)| keys.contains(key))
            .collect();
    }

    /// Validates and writes the submitted data. Edits start from the
    /// record's stored values so fields the form does not show survive.
    pub async fn submit(&mut self, store: &dyn DocumentStore, data: FormValues) -> Result<Record> {
        self.on_change(data);
        validate_required(&self.schema, &self.data, &self.schema.form_keys(), self.locale)?;
        match &self.mode {
            FormMode::Create => write_create(store, &self.schema, &self.data).await,
            FormMode::Edit(record) => {
                let mut values = record.values();
                values.extend(self.data.clone());
                write_update(store, &self.schema, record, &values).await
            }
        }
    }
}
