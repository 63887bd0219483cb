mod commands;
mod export;
mod field;
mod init;
mod output;
mod pickers;
mod record;
mod schema;
mod watch;

pub use commands::{
    ExportArgs, FieldArgs, FieldCommands, QueryArgs, RecordCommands, SchemaCommands,
};
pub use export::run_export;
pub use field::run_field;
pub use init::run_init;
pub use record::run_record;
pub use schema::run_schema;
pub use watch::run_watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Error;
use crate::grid::GridEngine;
use crate::i18n::Locale;
use crate::schema::SchemaRepository;
use crate::store::{DocumentStore, SqliteStore};

/// Config file looked up inside the data directory when `--config` is not
/// given.
pub const CONFIG_FILE_NAME: &str = "schemagrid.toml";

/// Builds the effective configuration: the config file (explicit, or the
/// one in the data directory if present) with command-line overrides on
/// top.
pub fn resolve_config(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    locale: Option<Locale>,
) -> anyhow::Result<AppConfig> {
    let mut config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => {
            let dir = data_dir
                .clone()
                .unwrap_or_else(|| AppConfig::default().data_dir);
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                AppConfig::load(&candidate)?
            } else {
                AppConfig::default()
            }
        }
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(locale) = locale {
        config.locale = locale;
    }
    Ok(config)
}

/// Everything a command needs: configuration plus the shared store handle.
pub struct Context {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
}

impl Context {
    /// Opens the database of an initialized data directory.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let db_path = config.db_path();
        if !db_path.exists() {
            anyhow::bail!(
                "Database not found at {}. Run 'schemagrid init' first.",
                db_path.display()
            );
        }
        let store = SqliteStore::new(&db_path)?;
        store.initialize().await?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    #[must_use]
    pub fn dyn_store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    #[must_use]
    pub fn repository(&self) -> SchemaRepository {
        SchemaRepository::new(self.dyn_store())
    }

    /// Turns a library error into the localized operator message.
    pub fn fail(&self, error: Error) -> anyhow::Error {
        tracing::debug!("Command failed: {}", error);
        anyhow::Error::msg(error.user_message(self.locale()))
    }

    /// A grid over `record_type` loaded with the current records.
    pub async fn load_grid(&self, record_type: &str) -> anyhow::Result<GridEngine> {
        let schema = self
            .repository()
            .get(record_type)
            .await
            .map_err(|e| match e {
                Error::NotFound => anyhow::anyhow!("Record type '{}' not found", record_type),
                other => self.fail(other),
            })?;
        let mut engine = GridEngine::new(self.dyn_store(), schema, self.locale())
            .with_page_size(self.config.page_size);
        let mut subscription = engine.subscribe().await.map_err(|e| self.fail(e))?;
        engine.sync(&mut subscription).await;
        subscription.unsubscribe();
        if let Some(error) = engine.load_error() {
            anyhow::bail!("{}: {}", self.locale().messages().load_failed, error);
        }
        Ok(engine)
    }
}

/// Splits `key=value` arguments.
pub(crate) fn split_assignment(text: &str) -> anyhow::Result<(&str, &str)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => anyhow::bail!("Expected key=value, got '{}'", text),
    }
}
