use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::export::ExportFormat;
use crate::i18n::Locale;

const DB_FILE_NAME: &str = "schemagrid.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub locale: Locale,
    /// Rows per grid page.
    pub page_size: usize,
    /// How often the store checks for commits made by other processes.
    pub poll_interval_ms: u64,
    pub export_formats: Vec<ExportFormat>,
}

impl AppConfig {
    /// Reads a TOML config file. Keys that are missing keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: AppConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.export_formats.is_empty() {
            return Err(Error::Config(
                "export_formats must name at least one format".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            locale: Locale::En,
            page_size: 10,
            poll_interval_ms: 500,
            export_formats: vec![ExportFormat::Xlsx, ExportFormat::Csv],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_config_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("schemagrid.toml");
        std::fs::write(&path, "locale = \"he\"\npage_size = 25\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.locale, Locale::He);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_load_rejects_zero_page_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("schemagrid.toml");
        std::fs::write(&path, "page_size = 0\n").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_db_path() {
        let config = AppConfig {
            data_dir: PathBuf::from("/srv/grid"),
            ..AppConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/srv/grid/schemagrid.db"));
    }
}
