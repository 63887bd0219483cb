use serde_json::Value;

use crate::schema::{
    FieldDraft, OptionDraft, apply_draft, delete_field, field_listing, rename_field,
    reorder_fields,
};
use crate::types::{ComponentType, FixedEdge, SchemaDocument, SelectOption};

use super::commands::{FieldArgs, FieldCommands};
use super::output::print_json;
use super::pickers::confirm_action;
use super::schema::{load_schema, print_fields};
use super::{Context, split_assignment};

pub async fn run_field(ctx: &Context, command: FieldCommands) -> anyhow::Result<()> {
    match command {
        FieldCommands::Add {
            record_type,
            key,
            field,
        } => {
            let schema = load_schema(ctx, &record_type).await?;
            let mut draft = FieldDraft::new(&key);
            apply_args(&mut draft, field)?;
            let next = apply_draft(&schema, None, draft).map_err(|e| ctx.fail(e))?;
            save(ctx, &next).await?;
            println!("{} ('{}')", ctx.locale().messages().column_saved, key);
        }
        FieldCommands::Update {
            record_type,
            key,
            field,
        } => {
            let schema = load_schema(ctx, &record_type).await?;
            let Some(def) = schema.field(&key) else {
                anyhow::bail!("Field '{}' does not exist in '{}'", key, record_type);
            };
            let mut draft = FieldDraft::from_definition(&key, def, schema.is_required(&key));
            apply_args(&mut draft, field)?;
            let next = apply_draft(&schema, Some(&key), draft).map_err(|e| ctx.fail(e))?;
            save(ctx, &next).await?;
            println!("{} ('{}')", ctx.locale().messages().column_saved, key);
        }
        FieldCommands::Rename {
            record_type,
            old_key,
            new_key,
        } => {
            let schema = load_schema(ctx, &record_type).await?;
            let Some(def) = schema.field(&old_key).cloned() else {
                anyhow::bail!("Field '{}' does not exist in '{}'", old_key, record_type);
            };
            let required = schema.is_required(&old_key);
            let next = rename_field(&schema, &old_key, &new_key, def, required)
                .map_err(|e| ctx.fail(e))?;
            save(ctx, &next).await?;
            println!("Renamed '{old_key}' to '{new_key}'");
        }
        FieldCommands::Remove {
            record_type,
            key,
            yes,
        } => {
            let schema = load_schema(ctx, &record_type).await?;
            let next = delete_field(&schema, &key).map_err(|e| ctx.fail(e))?;
            let confirmed = confirm_action(
                &format!("Remove field '{key}' from '{record_type}'? Stored values are kept."),
                yes,
            )?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
            save(ctx, &next).await?;
            println!("{} ('{}')", ctx.locale().messages().column_deleted, key);
        }
        FieldCommands::Reorder { record_type, keys } => {
            let schema = load_schema(ctx, &record_type).await?;
            let next = reorder_fields(&schema, &keys).map_err(|e| ctx.fail(e))?;
            save(ctx, &next).await?;
            println!("{}", ctx.locale().messages().columns_reordered);
        }
        FieldCommands::List { record_type, json } => {
            let schema = load_schema(ctx, &record_type).await?;
            if json {
                return print_json(&field_listing(&schema));
            }
            print_fields(&schema);
        }
    }
    Ok(())
}

async fn save(ctx: &Context, schema: &SchemaDocument) -> anyhow::Result<()> {
    ctx.repository().save(schema).await.map_err(|e| ctx.fail(e))
}

/// Overlays the flags that were given onto the draft.
fn apply_args(draft: &mut FieldDraft, args: FieldArgs) -> anyhow::Result<()> {
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(type_name) = args.type_name {
        draft.type_name = type_name;
    }
    if let Some(format) = args.format {
        draft.format = (!format.is_empty()).then_some(format);
    }
    if let Some(required) = args.required {
        draft.required = required;
    }
    if let Some(addable) = args.addable {
        draft.addable = addable;
    }
    if let Some(default) = args.default {
        draft.default = Some(default);
    }
    if let Some(width) = args.width {
        draft.width = Some(width);
    }
    if let Some(fixed) = args.fixed {
        draft.fixed = match fixed.as_str() {
            "left" => Some(FixedEdge::Left),
            "right" => Some(FixedEdge::Right),
            "none" | "" => None,
            other => anyhow::bail!("--fixed must be left, right or none, got '{}'", other),
        };
    }
    if let Some(ellipsis) = args.ellipsis {
        draft.ellipsis = ellipsis;
    }
    if let Some(sortable) = args.sortable {
        draft.sortable = sortable;
    }
    if let Some(filterable) = args.filterable {
        draft.filterable = filterable;
    }
    if let Some(hidden) = args.hidden {
        draft.hidden = hidden;
    }
    if let Some(component) = args.component {
        draft.component = ComponentType::parse(&component);
    }

    if !args.options.is_empty() {
        let options = args
            .options
            .iter()
            .map(|text| {
                let (label, value) = split_assignment(text)?;
                Ok(SelectOption::new(label, Value::String(value.to_string())))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        draft.options = OptionDraft::Static(options);
    } else if let Some(source_table) = args.source_table {
        let (label_field, value_field) = match (args.label_field, args.value_field) {
            (Some(label), Some(value)) => (label, value),
            _ => anyhow::bail!("--source-table needs --label-field and --value-field"),
        };
        draft.options = OptionDraft::Dynamic {
            source_table,
            label_field,
            value_field,
        };
    }
    Ok(())
}
