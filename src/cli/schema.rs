use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::Error;
use crate::schema::authoring::{
    TextFormat, parse_schema_file, parse_schema_text, parse_ui_text, template,
};
use crate::schema::field_listing;
use crate::types::{SchemaDocument, UiSchema};

use super::commands::SchemaCommands;
use super::output::{print_json, print_table};
use super::pickers::{confirm_action, pick_one};
use super::Context;

pub async fn run_schema(ctx: &Context, command: SchemaCommands) -> anyhow::Result<()> {
    match command {
        SchemaCommands::List { json } => list(ctx, json).await,
        SchemaCommands::Show { record_type, json } => show(ctx, record_type, json).await,
        SchemaCommands::Create {
            record_type,
            title,
            schema,
            ui,
        } => create(ctx, &record_type, title.as_deref(), schema.as_deref(), ui.as_deref()).await,
        SchemaCommands::Replace {
            record_type,
            title,
            schema,
            ui,
        } => replace(ctx, &record_type, title.as_deref(), &schema, ui.as_deref()).await,
        SchemaCommands::Import { pattern } => import(ctx, &pattern).await,
        SchemaCommands::Delete { record_type, yes } => delete(ctx, &record_type, yes).await,
    }
}

/// Loads a record type's schema, turning a miss into an operator message.
pub(crate) async fn load_schema(ctx: &Context, record_type: &str) -> anyhow::Result<SchemaDocument> {
    match ctx.repository().find(record_type).await {
        Ok(Some(schema)) => Ok(schema),
        Ok(None) => anyhow::bail!("Record type '{}' not found", record_type),
        Err(e) => Err(ctx.fail(e)),
    }
}

fn read_text(path: &Path) -> anyhow::Result<(String, TextFormat)> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok((text, TextFormat::from_path(path)))
}

fn read_ui(ctx: &Context, path: Option<&Path>) -> anyhow::Result<UiSchema> {
    match path {
        Some(path) => {
            let (text, format) = read_text(path)?;
            parse_ui_text(&text, format).map_err(|e| ctx.fail(e))
        }
        None => Ok(UiSchema::default()),
    }
}

async fn list(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let schemas = ctx.repository().list().await.map_err(|e| ctx.fail(e))?;

    if json {
        let docs: Vec<Value> = schemas
            .iter()
            .map(|s| Value::Object(s.to_data()))
            .collect();
        return print_json(&docs);
    }

    if schemas.is_empty() {
        println!("No record types defined.");
        return Ok(());
    }
    let headers = ["Record type", "Title", "Fields", "Version"].map(String::from);
    let rows: Vec<Vec<String>> = schemas
        .iter()
        .map(|s| {
            vec![
                s.record_type.clone(),
                s.title.clone(),
                s.fields().len().to_string(),
                s.version.to_string(),
            ]
        })
        .collect();
    print_table(&headers, &rows);
    Ok(())
}

async fn show(ctx: &Context, record_type: Option<String>, json: bool) -> anyhow::Result<()> {
    let record_type = match record_type {
        Some(record_type) => record_type,
        None => {
            let names = ctx
                .repository()
                .list()
                .await
                .map_err(|e| ctx.fail(e))?
                .into_iter()
                .map(|s| s.record_type)
                .collect();
            match pick_one("Record type:", names)? {
                Some(name) => name,
                None => return Ok(()),
            }
        }
    };
    let schema = load_schema(ctx, &record_type).await?;

    if json {
        return print_json(&Value::Object(schema.to_data()));
    }

    println!();
    println!("{} ({})", schema.title, schema.record_type);
    println!("Version: {}", schema.version);
    if let Some(updated) = schema.updated_at {
        println!("Updated: {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();
    print_fields(&schema);
    println!();
    Ok(())
}

pub(crate) fn print_fields(schema: &SchemaDocument) {
    let headers = ["Key", "Title", "Type", "Component", "Required", "Hidden", "Form"]
        .map(String::from);
    let flag = |b: bool| if b { "yes" } else { "" }.to_string();
    let rows: Vec<Vec<String>> = field_listing(schema)
        .into_iter()
        .map(|f| {
            vec![
                f.key,
                f.title,
                f.field_type,
                f.component.to_string(),
                flag(f.required),
                flag(f.hidden),
                flag(f.addable),
            ]
        })
        .collect();
    print_table(&headers, &rows);
}

async fn create(
    ctx: &Context,
    record_type: &str,
    title: Option<&str>,
    schema_path: Option<&Path>,
    ui_path: Option<&Path>,
) -> anyhow::Result<()> {
    let (schema, ui) = match schema_path {
        Some(path) => {
            let (text, format) = read_text(path)?;
            let schema = parse_schema_text(&text, format).map_err(|e| ctx.fail(e))?;
            (schema, read_ui(ctx, ui_path)?)
        }
        None => {
            let (schema, default_ui) = template();
            let ui = match ui_path {
                Some(_) => read_ui(ctx, ui_path)?,
                None => default_ui,
            };
            (schema, ui)
        }
    };

    let created = ctx
        .repository()
        .create(record_type, title, schema, ui)
        .await
        .map_err(|e| match e {
            Error::AlreadyExists => anyhow::anyhow!("Record type '{}' already exists", record_type),
            other => ctx.fail(other),
        })?;

    println!();
    println!(
        "Created record type '{}' with {} fields",
        created.record_type,
        created.fields().len()
    );
    println!();
    Ok(())
}

async fn replace(
    ctx: &Context,
    record_type: &str,
    title: Option<&str>,
    schema_path: &Path,
    ui_path: Option<&Path>,
) -> anyhow::Result<()> {
    let current = load_schema(ctx, record_type).await?;
    let (text, format) = read_text(schema_path)?;
    let schema = parse_schema_text(&text, format).map_err(|e| ctx.fail(e))?;
    let ui = read_ui(ctx, ui_path)?;

    let saved = ctx
        .repository()
        .replace_definition(&current, title, schema, ui)
        .await
        .map_err(|e| ctx.fail(e))?;

    println!(
        "{} ('{}', version {})",
        ctx.locale().messages().schema_saved,
        saved.record_type,
        saved.version
    );
    Ok(())
}

async fn import(ctx: &Context, pattern: &str) -> anyhow::Result<()> {
    let paths = glob::glob(pattern)
        .map_err(|e| anyhow::anyhow!("Invalid pattern '{}': {}", pattern, e))?;
    let repository = ctx.repository();

    let mut imported = 0;
    let mut failed = 0;
    for entry in paths {
        let path = entry?;
        let Some(record_type) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let (text, format) = read_text(&path)?;
        let result = match parse_schema_file(&text, format) {
            Ok(file) => {
                repository
                    .create(record_type, file.title.as_deref(), file.schema, file.ui)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(schema) => {
                imported += 1;
                println!("Imported '{}' from {}", schema.record_type, path.display());
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("Import of {} failed: {}", path.display(), e);
                eprintln!(
                    "Skipped {}: {}",
                    path.display(),
                    e.user_message(ctx.locale())
                );
            }
        }
    }

    println!();
    println!("Imported {imported} record types ({failed} skipped)");
    if imported == 0 && failed > 0 {
        anyhow::bail!("No schema files could be imported");
    }
    Ok(())
}

async fn delete(ctx: &Context, record_type: &str, yes: bool) -> anyhow::Result<()> {
    let schema = load_schema(ctx, record_type).await?;

    let confirmed = confirm_action(
        &format!("Delete the schema of '{}'? Its records are kept.", record_type),
        yes,
    )?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    ctx.repository()
        .delete(&schema)
        .await
        .map_err(|e| ctx.fail(e))?;

    println!("{} ('{}')", ctx.locale().messages().schema_deleted, record_type);
    Ok(())
}
