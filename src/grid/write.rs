use chrono::Utc;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::i18n::Locale;
use crate::record::normalize_form;
use crate::store::DocumentStore;
use crate::types::{FormValues, RawValue, Record, SchemaDocument};

fn is_blank(value: Option<&RawValue>) -> bool {
    match value {
        None => true,
        Some(RawValue::Absent | RawValue::Null) => true,
        Some(RawValue::String(s)) => s.is_empty(),
        Some(RawValue::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Rejects the submission if any required field among `keys` is blank.
/// The first offender is reported with the localized "please enter" text.
pub fn validate_required(
    schema: &SchemaDocument,
    values: &FormValues,
    keys: &[String],
    locale: Locale,
) -> Result<()> {
    match keys
        .iter()
        .find(|key| schema.is_required(key) && is_blank(values.get(key.as_str())))
    {
        Some(key) => Err(Error::Validation(locale.required_field(&schema.title_of(key)))),
        None => Ok(()),
    }
}

/// Writes a new record: every declared field normalized, version 0, both
/// timestamps set to now.
pub async fn write_create(
    store: &dyn DocumentStore,
    schema: &SchemaDocument,
    values: &FormValues,
) -> Result<Record> {
    let now = Utc::now();
    let mut record = Record {
        id: String::new(),
        fields: normalize_form(schema, values)?,
        created_date: Some(now),
        last_modified_date: Some(now),
        version: 0,
    };
    match store.create(&schema.record_type, &record.to_data()).await {
        Ok(id) => {
            info!("Created record {} in '{}'", id, schema.record_type);
            record.id = id;
            Ok(record)
        }
        Err(e) => {
            error!("Failed to create record in '{}': {}", schema.record_type, e);
            Err(e)
        }
    }
}

/// Full-document update of `existing`. Declared fields are replaced by
/// their normalized values; stored keys outside the schema are kept. The
/// version goes up by one and `createdDate` is carried over.
pub async fn write_update(
    store: &dyn DocumentStore,
    schema: &SchemaDocument,
    existing: &Record,
    values: &FormValues,
) -> Result<Record> {
    let normalized = normalize_form(schema, values)?;
    let mut fields = existing.fields.clone();
    for (key, value) in normalized {
        fields.insert(key, value);
    }
    let record = Record {
        id: existing.id.clone(),
        fields,
        created_date: existing.created_date,
        last_modified_date: Some(Utc::now()),
        version: existing.version + 1,
    };
    match store
        .update(&schema.record_type, &record.id, &record.to_data())
        .await
    {
        Ok(()) => {
            info!(
                "Updated record {} in '{}' to version {}",
                record.id, schema.record_type, record.version
            );
            Ok(record)
        }
        Err(e) => {
            error!(
                "Failed to update record {} in '{}': {}",
                record.id, schema.record_type, e
            );
            Err(e)
        }
    }
}
