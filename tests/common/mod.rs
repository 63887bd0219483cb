#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use schemagrid::error::{Error, Result};
use schemagrid::schema::SchemaRepository;
use schemagrid::store::{Document, DocumentStore, SqliteStore, Subscription};
use schemagrid::types::{SchemaDocument, TableSchema, UiSchema};

/// An in-memory store whose writes and listings can be made to fail.
pub struct FlakyStore {
    inner: SqliteStore,
    fail_writes: AtomicBool,
    fail_lists: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        let inner = SqliteStore::in_memory().expect("open in-memory store");
        inner.initialize().await.expect("initialize store");
        Arc::new(Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn initialize(&self) -> Result<()> {
        self.inner.initialize().await
    }

    async fn create(&self, collection: &str, data: &Map<String, Value>) -> Result<String> {
        self.check_write()?;
        self.inner.create(collection, data).await
    }

    async fn insert(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()> {
        self.check_write()?;
        self.inner.insert(collection, id, data).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Error::Store("listing unavailable".to_string()));
        }
        self.inner.list(collection).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        self.inner.find_by_field(collection, field, value).await
    }

    async fn update(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()> {
        self.check_write()?;
        self.inner.update(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.check_write()?;
        self.inner.delete(collection, id).await
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        self.inner.subscribe(collection).await
    }
}

/// Registers the `contacts` record type: `name` (required, filterable) and
/// `age`, with `age` first in the order hint.
pub async fn create_contacts(store: Arc<dyn DocumentStore>) -> SchemaDocument {
    let schema = TableSchema::from_value(json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {
                "type": "string",
                "title": "Name",
                "tableOptions": {"sortable": true, "filterable": true}
            },
            "age": {
                "type": "integer",
                "title": "Age",
                "tableOptions": {"sortable": true}
            }
        }
    }))
    .expect("valid schema");
    let ui = UiSchema::from_value(json!({"ui:order": ["age"]})).expect("valid ui schema");
    SchemaRepository::new(store)
        .create("contacts", Some("Contacts"), schema, ui)
        .await
        .expect("create contacts schema")
}

/// Inserts a record body directly, bypassing normalization.
pub async fn seed(store: &dyn DocumentStore, collection: &str, id: &str, body: Value) {
    let Value::Object(data) = body else {
        panic!("record body must be an object");
    };
    store
        .insert(collection, id, &data)
        .await
        .expect("seed record");
}
