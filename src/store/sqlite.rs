use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::schema::SCHEMA;
use super::{Document, DocumentStore, Snapshot, Subscription, SubscriptionHub};
use crate::error::{Error, Result};
use crate::types::format_timestamp;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    hub: Arc<SubscriptionHub>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;

        Ok(Self {
            conn: Mutex::new(conn),
            hub: SubscriptionHub::new(),
        })
    }

    /// Private in-memory database; used by tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            hub: SubscriptionHub::new(),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self, collection: &str) -> Result<Vec<Document>> {
        load_with(&self.conn(), collection)
    }

    /// Pushes the current result set of `collection` to its subscribers.
    /// Loading and pushing happen under the connection lock, so pushes
    /// reach subscribers in commit order.
    fn publish(&self, collection: &str) {
        if !self.hub.is_subscribed(collection) {
            return;
        }
        let conn = self.conn();
        let snapshot = match load_with(&conn, collection) {
            Ok(docs) => Snapshot::Data(docs.into()),
            Err(e) => {
                tracing::error!("Failed to load '{}' for subscribers: {}", collection, e);
                Snapshot::Error(e.to_string())
            }
        };
        self.hub.publish(collection, snapshot);
    }

    fn data_version(&self) -> Result<i64> {
        let version = self
            .conn()
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Republishes subscribed collections whenever another connection
    /// commits to the database file. Runs until `shutdown` is cancelled.
    pub fn watch_external_changes(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut last = match store.data_version() {
                Ok(version) => version,
                Err(e) => {
                    tracing::error!("Cannot watch for external changes: {}", e);
                    return;
                }
            };
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                match store.data_version() {
                    Ok(version) if version != last => {
                        last = version;
                        for collection in store.hub.subscribed_collections() {
                            tracing::debug!("External change, republishing '{}'", collection);
                            store.publish(&collection);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Failed to poll data version: {}", e),
                }
            }
        })
    }
}

fn load_with(conn: &Connection, collection: &str) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY created_at, rowid",
    )?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut docs = Vec::new();
    for row in rows {
        let (id, data) = row?;
        docs.push(document(id, &data)?);
    }
    Ok(docs)
}

fn document(id: String, data: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(data) => Ok(Document { id, data }),
        _ => Err(Error::Store(format!("document {id} is not a JSON object"))),
    }
}

fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn create(&self, collection: &str, data: &Map<String, Value>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert(collection, &id, data).await?;
        Ok(id)
    }

    async fn insert(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        let body = serde_json::to_string(data)?;
        let result = self.conn().execute(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![collection, id, body, now],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::AlreadyExists);
            }
            Err(e) => return Err(Error::from(e)),
        }
        self.publish(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let data = self
            .conn()
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        data.map(|data| document(id.to_string(), &data)).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.load(collection)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, data FROM documents
             WHERE collection = ?1 AND json_extract(data, ?2) = json_extract(?3, '$')
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map(
            params![collection, field_path(field), value.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        let mut docs = Vec::new();
        for row in rows {
            let (id, data) = row?;
            docs.push(document(id, &data)?);
        }
        Ok(docs)
    }

    async fn update(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()> {
        let body = serde_json::to_string(data)?;
        let changed = self.conn().execute(
            "UPDATE documents SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, id, body, format_timestamp(&Utc::now())],
        )?;
        if changed == 0 {
            return Err(Error::NotFound);
        }
        self.publish(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        if changed > 0 {
            self.publish(collection);
        }
        Ok(changed > 0)
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        // Registered before loading, so a commit landing in between is
        // republished rather than lost. The placeholder is replaced before
        // the subscription is handed out.
        let subscription = self
            .hub
            .subscribe(collection, Snapshot::Data(Vec::<Document>::new().into()));
        let conn = self.conn();
        let docs = load_with(&conn, collection)?;
        self.hub.publish(collection, Snapshot::Data(docs.into()));
        drop(conn);
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().await.unwrap();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"documents".to_string()));
    }

    #[tokio::test]
    async fn test_document_crud() {
        let store = store().await;

        let id = store
            .create("contacts", &body(json!({"name": "Smith", "age": 30})))
            .await
            .unwrap();

        let fetched = store.get("contacts", &id).await.unwrap().unwrap();
        assert_eq!(fetched.data["name"], json!("Smith"));
        assert!(store.get("other", &id).await.unwrap().is_none());

        store
            .update("contacts", &id, &body(json!({"name": "Jones"})))
            .await
            .unwrap();
        let fetched = store.get("contacts", &id).await.unwrap().unwrap();
        assert_eq!(fetched.data, body(json!({"name": "Jones"})));

        assert!(store.delete("contacts", &id).await.unwrap());
        assert!(!store.delete("contacts", &id).await.unwrap());
        assert!(store.get("contacts", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = store().await;
        let err = store
            .update("contacts", "missing", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn test_insert_duplicate_id() {
        let store = store().await;
        store.insert("contacts", "c1", &Map::new()).await.unwrap();
        let err = store.insert("contacts", "c1", &Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
        // Same id in another collection is a different document.
        store.insert("tags", "c1", &Map::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keeps_creation_order() {
        let store = store().await;
        for name in ["c", "a", "b"] {
            store.insert("contacts", name, &Map::new()).await.unwrap();
        }
        let ids: Vec<String> = store
            .list("contacts")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_find_by_field() {
        let store = store().await;
        store
            .create("schemas", &body(json!({"tableName": "contacts"})))
            .await
            .unwrap();
        store
            .create("schemas", &body(json!({"tableName": "tags"})))
            .await
            .unwrap();

        let found = store
            .find_by_field("schemas", "tableName", &json!("tags"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data["tableName"], json!("tags"));

        let none = store
            .find_by_field("schemas", "tableName", &json!("missing"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_writes_republish_to_subscribers() {
        let store = store().await;
        let mut sub = store.subscribe("contacts").await.unwrap();
        let initial = sub.next().await.unwrap();
        assert!(initial.documents().unwrap().is_empty());

        store
            .create("contacts", &body(json!({"name": "Smith"})))
            .await
            .unwrap();
        let pushed = sub.next().await.unwrap();
        assert_eq!(pushed.documents().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_refreshes_an_existing_channel() {
        let store = store().await;
        let mut first = store.subscribe("contacts").await.unwrap();
        assert!(first.next().await.unwrap().documents().unwrap().is_empty());

        // A commit whose push never reached the channel.
        store
            .conn()
            .execute(
                "INSERT INTO documents (collection, id, data, created_at, updated_at)
                 VALUES ('contacts', 'c1', '{}', '2024-01-01', '2024-01-01')",
                [],
            )
            .unwrap();

        let mut second = store.subscribe("contacts").await.unwrap();
        assert_eq!(second.next().await.unwrap().documents().unwrap().len(), 1);
        assert_eq!(first.next().await.unwrap().documents().unwrap().len(), 1);
        assert_eq!(store.hub.subscriber_count("contacts"), 2);
    }

    #[tokio::test]
    async fn test_external_changes_are_republished() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.db");
        let store = Arc::new(SqliteStore::new(&path).unwrap());
        store.initialize().await.unwrap();

        let mut sub = store.subscribe("contacts").await.unwrap();
        sub.next().await.unwrap();

        let shutdown = CancellationToken::new();
        let watcher = store.watch_external_changes(Duration::from_millis(20), shutdown.clone());

        let other = SqliteStore::new(&path).unwrap();
        other.insert("contacts", "c1", &Map::new()).await.unwrap();

        let pushed = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pushed.documents().unwrap().len(), 1);

        shutdown.cancel();
        watcher.await.unwrap();
    }
}
