use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::value::{FormValues, RawValue, format_timestamp, parse_timestamp};
use crate::store::Document;

/// Bookkeeping keys stored alongside field values in a record document.
pub const META_KEYS: [&str; 4] = ["id", "createdDate", "lastModifiedDate", "version"];

#[must_use]
pub fn is_meta_key(key: &str) -> bool {
    META_KEYS.contains(&key)
}

/// One persisted instance of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Map<String, Value>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Record {
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        let mut fields = doc.data.clone();
        let created_date = fields.remove("createdDate").as_ref().and_then(parse_timestamp);
        let last_modified_date = fields
            .remove("lastModifiedDate")
            .as_ref()
            .and_then(parse_timestamp);
        let version = fields
            .remove("version")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0);
        fields.remove("id");
        Self {
            id: doc.id.clone(),
            fields,
            created_date,
            last_modified_date,
            version,
        }
    }

    /// Document body as persisted: field values followed by the bookkeeping
    /// keys.
    #[must_use]
    pub fn to_data(&self) -> Map<String, Value> {
        let mut data = self.fields.clone();
        if let Some(created) = &self.created_date {
            data.insert("createdDate".to_string(), Value::String(format_timestamp(created)));
        }
        if let Some(modified) = &self.last_modified_date {
            data.insert(
                "lastModifiedDate".to_string(),
                Value::String(format_timestamp(modified)),
            );
        }
        data.insert("version".to_string(), Value::from(self.version));
        data
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field values as editor input, the starting draft of an edit.
    #[must_use]
    pub fn values(&self) -> FormValues {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::from(v)))
            .collect()
    }
}
