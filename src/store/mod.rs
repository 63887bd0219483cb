mod schema;
mod sqlite;
mod subscription;

pub use sqlite::SqliteStore;
pub use subscription::{Snapshot, Subscription, SubscriptionHub};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// A stored document: an opaque id plus a JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

/// DocumentStore defines the persistence interface the engine is built on.
///
/// Handles are shared as `Arc<dyn DocumentStore>`; every component that
/// reads or writes receives one explicitly.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    /// Creates a document under a store-assigned id and returns the id.
    async fn create(&self, collection: &str, data: &Map<String, Value>) -> Result<String>;

    /// Creates a document under a caller-chosen id.
    async fn insert(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// All documents of a collection, in creation order.
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Documents whose top-level `field` equals `value`.
    async fn find_by_field(&self, collection: &str, field: &str, value: &Value)
    -> Result<Vec<Document>>;

    /// Replaces the whole body of an existing document.
    async fn update(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Opens a live view of a collection. The current result set is
    /// available immediately and every later write republishes it in full.
    async fn subscribe(&self, collection: &str) -> Result<Subscription>;
}
