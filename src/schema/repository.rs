use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{DocumentStore, Snapshot, Subscription};
use crate::types::{SchemaDocument, TableSchema, UiSchema};
use crate::validation::{SCHEMAS_COLLECTION, validate_record_type};

/// Schema documents, stored in their own collection and located by record
/// type name.
#[derive(Clone)]
pub struct SchemaRepository {
    store: Arc<dyn DocumentStore>,
}

impl SchemaRepository {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn find(&self, record_type: &str) -> Result<Option<SchemaDocument>> {
        let docs = self
            .store
            .find_by_field(
                SCHEMAS_COLLECTION,
                "tableName",
                &Value::String(record_type.to_string()),
            )
            .await?;
        docs.first().map(SchemaDocument::from_document).transpose()
    }

    /// Like [`find`](Self::find), but a missing schema is an error.
    pub async fn get(&self, record_type: &str) -> Result<SchemaDocument> {
        self.find(record_type).await?.ok_or(Error::NotFound)
    }

    /// Every readable schema document. Documents that fail to parse are
    /// logged and skipped.
    pub async fn list(&self) -> Result<Vec<SchemaDocument>> {
        let docs = self.store.list(SCHEMAS_COLLECTION).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match SchemaDocument::from_document(doc) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    tracing::warn!("Skipping unreadable schema document {}: {}", doc.id, e);
                    None
                }
            })
            .collect())
    }

    pub async fn create(
        &self,
        record_type: &str,
        title: Option<&str>,
        schema: TableSchema,
        ui: UiSchema,
    ) -> Result<SchemaDocument> {
        validate_record_type(record_type)?;
        if self.find(record_type).await?.is_some() {
            return Err(Error::AlreadyExists);
        }
        let now = Utc::now();
        let mut doc = SchemaDocument {
            id: String::new(),
            record_type: record_type.to_string(),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or(record_type)
                .to_string(),
            schema,
            ui,
            version: 1,
            created_at: Some(now),
            updated_at: Some(now),
        };
        doc.restore_invariants();
        doc.id = self.store.create(SCHEMAS_COLLECTION, &doc.to_data()).await?;
        tracing::info!("Created schema for '{}' ({})", record_type, doc.id);
        Ok(doc)
    }

    /// Persists a mutator result as one full-document write.
    pub async fn save(&self, schema: &SchemaDocument) -> Result<()> {
        let mut clean = schema.clone();
        clean.restore_invariants();
        self.store
            .update(SCHEMAS_COLLECTION, &schema.id, &clean.to_data())
            .await
            .inspect_err(|e| tracing::error!("Failed to save schema '{}': {}", schema.record_type, e))?;
        tracing::info!(
            "Saved schema '{}' at version {}",
            schema.record_type,
            schema.version
        );
        Ok(())
    }

    /// Replaces title, schema body and overlay wholesale, as the raw-text
    /// editor does.
    pub async fn replace_definition(
        &self,
        current: &SchemaDocument,
        title: Option<&str>,
        schema: TableSchema,
        ui: UiSchema,
    ) -> Result<SchemaDocument> {
        let mut next = current.clone();
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            next.title = title.to_string();
        }
        next.schema = schema;
        next.ui = ui;
        next.restore_invariants();
        next.version += 1;
        next.updated_at = Some(Utc::now());
        self.save(&next).await?;
        Ok(next)
    }

    /// Removes the schema document only; records of that type stay.
    pub async fn delete(&self, schema: &SchemaDocument) -> Result<bool> {
        let deleted = self.store.delete(SCHEMAS_COLLECTION, &schema.id).await?;
        if deleted {
            tracing::info!("Deleted schema '{}'", schema.record_type);
        }
        Ok(deleted)
    }

    /// Live view of the schema collection, narrowed by [`SchemaWatch`].
    pub async fn watch(&self, record_type: &str) -> Result<SchemaWatch> {
        Ok(SchemaWatch {
            record_type: record_type.to_string(),
            subscription: self.store.subscribe(SCHEMAS_COLLECTION).await?,
        })
    }
}

/// A subscription to one record type's schema document.
pub struct SchemaWatch {
    record_type: String,
    subscription: Subscription,
}

/// One push of a [`SchemaWatch`].
#[derive(Debug, Clone)]
pub enum SchemaUpdate {
    Loaded(Box<SchemaDocument>),
    Missing,
    Error(String),
}

impl SchemaWatch {
    pub async fn next(&mut self) -> Option<SchemaUpdate> {
        let snapshot = self.subscription.next().await?;
        Some(self.narrow(&snapshot))
    }

    fn narrow(&self, snapshot: &Snapshot) -> SchemaUpdate {
        let docs = match snapshot {
            Snapshot::Data(docs) => docs,
            Snapshot::Error(e) => return SchemaUpdate::Error(e.clone()),
        };
        let found = docs.iter().find(|doc| {
            doc.data.get("tableName").and_then(Value::as_str) == Some(self.record_type.as_str())
        });
        match found.map(SchemaDocument::from_document) {
            Some(Ok(schema)) => SchemaUpdate::Loaded(Box::new(schema)),
            Some(Err(e)) => SchemaUpdate::Error(e.to_string()),
            None => SchemaUpdate::Missing,
        }
    }
}
