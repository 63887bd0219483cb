use std::fs;

use crate::config::AppConfig;
use crate::store::{DocumentStore, SqliteStore};

use super::CONFIG_FILE_NAME;

/// Creates the data directory, the database and a config file holding the
/// effective settings.
pub async fn run_init(config: &AppConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let db_path = config.db_path();
    let existed = db_path.exists();
    let store = SqliteStore::new(&db_path)?;
    store.initialize().await?;

    let config_path = config.data_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        fs::write(&config_path, toml::to_string_pretty(config)?)?;
    }

    println!();
    if existed {
        println!("Database already initialized at {}", db_path.display());
    } else {
        println!("Initialized database at {}", db_path.display());
    }
    println!("Config: {}", config_path.display());
    println!();

    Ok(())
}
