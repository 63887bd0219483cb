//! Grid and form behavior through the public library API, against an
//! in-memory store.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{FlakyStore, create_contacts, seed};
use schemagrid::error::Error;
use schemagrid::export::ExportFormat;
use schemagrid::grid::{FormMode, GridEngine, SortDirection, write_update};
use schemagrid::i18n::Locale;
use schemagrid::schema::{SchemaRepository, delete_field, grid_visible, project, resolve_options};
use schemagrid::store::DocumentStore;
use schemagrid::types::{FieldDefinition, FormValues, RawValue, SelectOption};

async fn loaded_engine(store: Arc<FlakyStore>) -> GridEngine {
    let schema = SchemaRepository::new(store.clone())
        .get("contacts")
        .await
        .expect("contacts schema");
    let mut engine = GridEngine::new(store, schema, Locale::En);
    let mut subscription = engine.subscribe().await.expect("subscribe");
    assert!(engine.sync(&mut subscription).await);
    subscription.unsubscribe();
    engine
}

async fn contacts_store() -> Arc<FlakyStore> {
    let store = FlakyStore::new().await;
    create_contacts(store.clone()).await;
    seed(store.as_ref(), "contacts", "r1", json!({"name": "Smith", "age": 40, "version": 1})).await;
    seed(store.as_ref(), "contacts", "r2", json!({"name": "Jones", "version": 1})).await;
    store
}

#[tokio::test]
async fn test_grid_columns_follow_order_hint() {
    let store = FlakyStore::new().await;
    let schema = create_contacts(store.clone()).await;

    let keys = project(schema.fields(), &schema.ui.order, grid_visible);
    assert_eq!(keys, vec!["age".to_string(), "name".to_string()]);
}

#[tokio::test]
async fn test_partial_save_fills_defaults_and_bumps_version() {
    let store = FlakyStore::new().await;
    let schema = create_contacts(store.clone()).await;
    seed(store.as_ref(), "contacts", "r1", json!({"version": 4})).await;
    let existing = schemagrid::types::Record::from_document(
        &store.get("contacts", "r1").await.unwrap().unwrap(),
    );

    let values = FormValues::from([("age".to_string(), RawValue::from("30"))]);
    let saved = write_update(store.as_ref(), &schema, &existing, &values)
        .await
        .unwrap();

    assert_eq!(saved.version, 5);
    assert_eq!(saved.get("name"), Some(&json!("")));
    assert_eq!(saved.get("age"), Some(&json!(30)));
}

#[tokio::test]
async fn test_delete_field_clears_order_hint() {
    let store = FlakyStore::new().await;
    let schema = create_contacts(store.clone()).await;

    let next = delete_field(&schema, "age").unwrap();
    assert!(next.field("age").is_none());
    assert!(next.ui.order.is_empty());
    assert_eq!(next.version, schema.version + 1);

    // The input value is left untouched.
    assert!(schema.field("age").is_some());
}

#[tokio::test]
async fn test_dynamic_options_come_from_live_records() {
    let store = FlakyStore::new().await;
    seed(store.as_ref(), "tags", "1", json!({"name": "Urgent", "code": "U"})).await;
    let def: FieldDefinition = serde_json::from_value(json!({
        "type": "string",
        "tableOptions": {"componentType": "dropdown"},
        "dropdownOptions": {
            "type": "dynamic",
            "sourceTable": "tags",
            "labelField": "name",
            "valueField": "code"
        }
    }))
    .unwrap();

    let resolved = resolve_options(&def, store.as_ref(), Locale::En).await;
    assert_eq!(resolved.options, vec![SelectOption::new("Urgent", "U")]);
    assert!(resolved.warning.is_none());

    store.fail_lists(true);
    let resolved = resolve_options(&def, store.as_ref(), Locale::En).await;
    assert!(resolved.options.is_empty());
    assert_eq!(resolved.warning.as_deref(), Some("Failed to load data"));
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let mut engine = loaded_engine(contacts_store().await).await;

    engine.set_search("smith");
    let ids: Vec<&str> = engine
        .filtered_records()
        .into_iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["r1"]);

    engine.set_search("");
    assert_eq!(engine.filtered_records().len(), 2);
}

#[tokio::test]
async fn test_sort_puts_missing_values_last() {
    let mut engine = loaded_engine(contacts_store().await).await;
    engine.set_sort("age", SortDirection::Descending).unwrap();

    let page = engine.current_page();
    let ids: Vec<&str> = page.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
    assert_eq!(page.summary(Locale::En), "1-2 of 2 records");
}

#[tokio::test]
async fn test_failed_save_keeps_row_editing() {
    let store = contacts_store().await;
    let mut engine = loaded_engine(store.clone()).await;

    engine.begin_edit("r1").unwrap();
    engine.set_draft_value("age", RawValue::from("41")).unwrap();
    store.fail_writes(true);

    let err = engine.save_edit().await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(engine.editing_id(), Some("r1"));
    assert_eq!(engine.draft().unwrap()["age"], RawValue::from("41"));

    store.fail_writes(false);
    let saved = engine.save_edit().await.unwrap();
    assert_eq!(saved.get("age"), Some(&json!(41)));
    assert_eq!(saved.version, 2);
    assert!(engine.editing_id().is_none());
}

#[tokio::test]
async fn test_second_row_cannot_enter_editing() {
    let mut engine = loaded_engine(contacts_store().await).await;
    engine.begin_edit("r1").unwrap();

    let err = engine.begin_edit("r2").unwrap_err();
    assert!(matches!(err, Error::EditInProgress { ref record_id } if record_id == "r1"));

    engine.cancel_edit();
    engine.begin_edit("r2").unwrap();
    assert_eq!(engine.editing_id(), Some("r2"));
}

#[tokio::test]
async fn test_failed_form_submit_keeps_session_open() {
    let store = contacts_store().await;
    let engine = loaded_engine(store.clone()).await;
    let mut session = engine.open_create();

    let data = FormValues::from([
        ("name".to_string(), RawValue::from("Adams")),
        ("age".to_string(), RawValue::from(52_i64)),
    ]);
    store.fail_writes(true);
    assert!(session.submit(store.as_ref(), data.clone()).await.is_err());
    assert_eq!(session.data()["name"], RawValue::from("Adams"));
    assert_eq!(*session.mode(), FormMode::Create);

    store.fail_writes(false);
    let record = session.submit(store.as_ref(), data).await.unwrap();
    assert_eq!(record.version, 0);
    assert_eq!(record.get("name"), Some(&json!("Adams")));
    assert!(record.created_date.is_some());
}

#[tokio::test]
async fn test_form_requires_name() {
    let store = contacts_store().await;
    let engine = loaded_engine(store.clone()).await;
    let mut session = engine.open_create();

    let data = FormValues::from([("age".to_string(), RawValue::from(3_i64))]);
    let err = session.submit(store.as_ref(), data).await.unwrap_err();
    assert!(matches!(err, Error::Validation(ref message) if message == "Please enter Name"));
}

#[tokio::test]
async fn test_live_snapshot_replaces_records() {
    let store = contacts_store().await;
    let schema = SchemaRepository::new(store.clone())
        .get("contacts")
        .await
        .unwrap();
    let mut engine = GridEngine::new(store.clone(), schema, Locale::En);
    let mut subscription = engine.subscribe().await.unwrap();
    assert!(engine.sync(&mut subscription).await);
    assert_eq!(engine.records().len(), 2);

    seed(store.as_ref(), "contacts", "r3", json!({"name": "Brown"})).await;
    assert!(engine.sync(&mut subscription).await);
    assert_eq!(engine.records().len(), 3);

    subscription.unsubscribe();
}

#[tokio::test]
async fn test_preload_renders_dynamic_labels() {
    let store = FlakyStore::new().await;
    seed(store.as_ref(), "tags", "t1", json!({"name": "Urgent", "code": "U"})).await;
    let schema = schemagrid::types::TableSchema::from_value(json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "title": "Title"},
            "tag": {
                "type": "string",
                "title": "Tag",
                "tableOptions": {"componentType": "dropdown"},
                "dropdownOptions": {
                    "type": "dynamic",
                    "sourceTable": "tags",
                    "labelField": "name",
                    "valueField": "code"
                }
            }
        }
    }))
    .unwrap();
    let ui = schemagrid::types::UiSchema::from_value(json!({"ui:order": ["title", "tag"]})).unwrap();
    SchemaRepository::new(store.clone())
        .create("tasks", None, schema, ui)
        .await
        .unwrap();
    seed(store.as_ref(), "tasks", "k1", json!({"title": "Ship", "tag": "U"})).await;

    let schema = SchemaRepository::new(store.clone()).get("tasks").await.unwrap();
    let mut engine = GridEngine::new(store.clone(), schema, Locale::En);
    let mut subscription = engine.subscribe().await.unwrap();
    engine.sync(&mut subscription).await;
    subscription.unsubscribe();

    let warnings = engine.preload_options().await;
    assert!(warnings.is_empty());
    let record = engine.record("k1").unwrap().clone();
    assert_eq!(engine.render_row(&record), vec!["Ship".to_string(), "Urgent".to_string()]);
}

#[tokio::test]
async fn test_export_respects_search() {
    let mut engine = loaded_engine(contacts_store().await).await;
    engine.set_search("jones");

    let file = engine.export(ExportFormat::Csv).unwrap();
    assert_eq!(file.file_name, "contacts.csv");
    assert_eq!(String::from_utf8(file.bytes).unwrap(), "Age,Name\n-,Jones\n");
}

#[tokio::test]
async fn test_deleted_row_leaves_the_grid() {
    let store = contacts_store().await;
    let mut engine = loaded_engine(store.clone()).await;

    assert!(engine.delete("r2").await.unwrap());
    assert!(engine.record("r2").is_none());
    assert_eq!(store.get("contacts", "r2").await.unwrap(), None::<schemagrid::store::Document>);
    assert!(!engine.delete("r2").await.unwrap());
    assert_eq!(engine.records().len(), 1);
}
