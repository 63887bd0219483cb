use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::schema::SchemaUpdate;

use super::Context;
use super::record::print_page;

/// Follows a record type until Ctrl-C, reprinting the first page whenever
/// its records or its schema change, including changes made by other
/// processes.
pub async fn run_watch(ctx: &Context, record_type: &str) -> anyhow::Result<()> {
    let mut engine = ctx.load_grid(record_type).await?;
    let mut records = engine.subscribe().await.map_err(|e| ctx.fail(e))?;
    let mut schema = ctx
        .repository()
        .watch(record_type)
        .await
        .map_err(|e| ctx.fail(e))?;

    let shutdown = CancellationToken::new();
    let poller = ctx.store.watch_external_changes(
        Duration::from_millis(ctx.config.poll_interval_ms),
        shutdown.clone(),
    );

    println!("Watching '{record_type}'. Press Ctrl-C to stop.");
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            alive = engine.sync(&mut records) => {
                if !alive {
                    break Ok(());
                }
                if let Some(error) = engine.load_error() {
                    eprintln!("{}: {}", ctx.locale().messages().load_failed, error);
                    continue;
                }
            }
            update = schema.next() => match update {
                Some(SchemaUpdate::Loaded(next)) => {
                    if next.version == engine.schema().version {
                        continue;
                    }
                    engine.apply_schema(*next);
                }
                Some(SchemaUpdate::Missing) => {
                    break Err(anyhow::anyhow!("Record type '{}' was deleted", record_type));
                }
                Some(SchemaUpdate::Error(error)) => {
                    eprintln!("{}: {}", ctx.locale().messages().load_failed, error);
                    continue;
                }
                None => break Ok(()),
            },
        }
        for warning in engine.preload_options().await {
            eprintln!("{warning}");
        }
        println!();
        print_page(&engine);
    };

    records.unsubscribe();
    shutdown.cancel();
    poller.await.ok();
    result
}
