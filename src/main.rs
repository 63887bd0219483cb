use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemagrid::cli::{
    Context, ExportArgs, FieldCommands, RecordCommands, SchemaCommands, resolve_config,
    run_export, run_field, run_init, run_record, run_schema, run_watch,
};
use schemagrid::i18n::Locale;

#[derive(Parser)]
#[command(name = "schemagrid")]
#[command(about = "Schema-driven data grids over a document store", long_about = None)]
struct Cli {
    /// Data directory holding the database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML config file (defaults to schemagrid.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Display language: en or he
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and database
    Init,

    /// Manage record types
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Manage the fields of a record type
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// List and edit records
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Export the filtered records of a record type
    Export(ExportArgs),

    /// Follow a record type's records live
    Watch { record_type: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schemagrid=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.data_dir, cli.locale)?;
    config.validate()?;

    if let Commands::Init = cli.command {
        return run_init(&config).await;
    }

    let ctx = Context::open(config).await?;
    match cli.command {
        Commands::Init => {}
        Commands::Schema { command } => run_schema(&ctx, command).await?,
        Commands::Field { command } => run_field(&ctx, command).await?,
        Commands::Record { command } => run_record(&ctx, command).await?,
        Commands::Export(args) => run_export(&ctx, args).await?,
        Commands::Watch { record_type } => run_watch(&ctx, &record_type).await?,
    }

    Ok(())
}
