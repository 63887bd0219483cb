use std::fs;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::grid::{GridEngine, SortDirection};
use crate::schema::authoring::{TextFormat, parse_value};
use crate::schema::resolve_options;
use crate::types::{FormValues, RawValue, Record, display_value};

use super::commands::{QueryArgs, RecordCommands};
use super::output::{print_json, print_table};
use super::pickers::confirm_action;
use super::{Context, split_assignment};

pub async fn run_record(ctx: &Context, command: RecordCommands) -> anyhow::Result<()> {
    match command {
        RecordCommands::List {
            record_type,
            query,
            page,
            page_size,
            json,
        } => {
            let mut engine = ctx.load_grid(&record_type).await?;
            apply_query(ctx, &mut engine, query)?;
            if let Some(page_size) = page_size {
                engine.set_page_size(page_size);
            }
            engine.set_page(page);
            for warning in engine.preload_options().await {
                eprintln!("{warning}");
            }
            if json {
                let rows: Vec<RecordOutput> = engine
                    .current_page()
                    .rows
                    .into_iter()
                    .map(RecordOutput::from)
                    .collect();
                return print_json(&rows);
            }
            print_page(&engine);
        }
        RecordCommands::Add {
            record_type,
            values,
            data,
        } => {
            let engine = ctx.load_grid(&record_type).await?;
            let mut session = engine.open_create();
            let mut submitted = session.data().clone();
            if let Some(path) = data {
                let text = fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
                match parse_value(&text, TextFormat::from_path(&path)).map_err(|e| ctx.fail(e))? {
                    Value::Object(map) => {
                        submitted.extend(map.into_iter().map(|(k, v)| (k, RawValue::from(v))));
                    }
                    _ => anyhow::bail!("{} must contain a mapping of field values", path.display()),
                }
            }
            submitted.extend(parse_assignments(&values)?);

            let record = session
                .submit(ctx.store.as_ref(), submitted)
                .await
                .map_err(|e| ctx.fail(e))?;
            println!("{} ({})", ctx.locale().messages().record_created, record.id);
        }
        RecordCommands::Edit {
            record_type,
            id,
            values,
        } => {
            let mut engine = ctx.load_grid(&record_type).await?;
            engine.begin_edit(&id).map_err(|e| match e {
                crate::error::Error::NotFound => anyhow::anyhow!("Record '{}' not found", id),
                other => ctx.fail(other),
            })?;
            for (key, value) in parse_assignments(&values)? {
                engine.set_draft_value(&key, value).map_err(|e| ctx.fail(e))?;
            }
            let record = engine.save_edit().await.map_err(|e| ctx.fail(e))?;
            println!(
                "{} ({}, version {})",
                ctx.locale().messages().record_updated,
                record.id,
                record.version
            );
        }
        RecordCommands::Delete {
            record_type,
            id,
            yes,
        } => {
            let mut engine = ctx.load_grid(&record_type).await?;
            if engine.record(&id).is_none() {
                anyhow::bail!("Record '{}' not found", id);
            }
            let confirmed = confirm_action(&format!("Delete record '{id}'?"), yes)?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
            engine.delete(&id).await.map_err(|e| {
                tracing::error!("Failed to delete record {}: {}", id, e);
                anyhow::anyhow!("{}", ctx.locale().messages().delete_failed)
            })?;
            println!("{}", ctx.locale().messages().record_deleted);
        }
        RecordCommands::Options { record_type, field } => {
            let schema = super::schema::load_schema(ctx, &record_type).await?;
            let Some(def) = schema.field(&field) else {
                anyhow::bail!("Field '{}' does not exist in '{}'", field, record_type);
            };
            let resolved = resolve_options(def, ctx.store.as_ref(), ctx.locale()).await;
            if let Some(warning) = &resolved.warning {
                eprintln!("{warning}");
            }
            let headers = ["Label", "Value"].map(String::from);
            let rows: Vec<Vec<String>> = resolved
                .options
                .iter()
                .map(|o| vec![o.label.clone(), display_value(&o.value)])
                .collect();
            print_table(&headers, &rows);
        }
    }
    Ok(())
}

/// Applies search, filter and sort flags to a loaded grid.
pub(crate) fn apply_query(ctx: &Context, engine: &mut GridEngine, query: QueryArgs) -> anyhow::Result<()> {
    if let Some(search) = query.search {
        engine.set_search(search);
    }
    let mut filters: Vec<(String, Vec<String>)> = Vec::new();
    for text in &query.filters {
        let (key, value) = split_assignment(text)?;
        match filters.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => filters.push((key.to_string(), vec![value.to_string()])),
        }
    }
    for (key, values) in filters {
        engine.set_filter(&key, values).map_err(|e| ctx.fail(e))?;
    }
    if let Some(sort) = query.sort {
        let direction = if query.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        engine.set_sort(&sort, direction).map_err(|e| ctx.fail(e))?;
    }
    Ok(())
}

/// `key=value` pairs as editor input. Values that read as JSON (numbers,
/// booleans, null, lists) keep that type; anything else is text.
fn parse_assignments(values: &[String]) -> anyhow::Result<FormValues> {
    let mut out = FormValues::new();
    for text in values {
        let (key, value) = split_assignment(text)?;
        let raw = serde_json::from_str::<Value>(value)
            .map(RawValue::from)
            .unwrap_or_else(|_| RawValue::String(value.to_string()));
        out.insert(key.to_string(), raw);
    }
    Ok(out)
}

pub(crate) fn print_page(engine: &GridEngine) {
    let page = engine.current_page();
    let mut headers = vec!["ID".to_string()];
    headers.extend(engine.columns().into_iter().map(|c| c.title));
    let rows: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|record| {
            let mut row = vec![record.id.clone()];
            row.extend(engine.render_row(record));
            row
        })
        .collect();
    print_table(&headers, &rows);
    println!();
    println!(
        "{}  (page {}/{})",
        page.summary(engine.locale()),
        page.number,
        page.page_count
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordOutput {
    id: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<&Record> for RecordOutput {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            fields: record.to_data(),
        }
    }
}
