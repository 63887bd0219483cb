use std::fs;

use super::Context;
use super::commands::ExportArgs;
use super::record::apply_query;

pub async fn run_export(ctx: &Context, args: ExportArgs) -> anyhow::Result<()> {
    if !ctx.config.export_formats.contains(&args.format) {
        anyhow::bail!("Export format '{}' is disabled in the configuration", args.format);
    }

    let mut engine = ctx.load_grid(&args.record_type).await?;
    apply_query(ctx, &mut engine, args.query)?;
    for warning in engine.preload_options().await {
        eprintln!("{warning}");
    }

    let file = engine.export(args.format).map_err(|e| {
        tracing::error!("Export of '{}' failed: {}", args.record_type, e);
        anyhow::anyhow!("{}", ctx.locale().messages().export_failed)
    })?;

    fs::create_dir_all(&args.out)?;
    let path = args.out.join(&file.file_name);
    fs::write(&path, &file.bytes)?;

    println!(
        "{}: {} ({} rows, {})",
        ctx.locale().messages().export_done,
        path.display(),
        engine.filtered_records().len(),
        file.mime_type
    );
    Ok(())
}
