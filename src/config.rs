// Board configuration loaded from YAML

use crate::blob::{BlobStore, FileBlobStore};
use crate::sqlite::SqliteBlobStore;
use crate::store::{DEFAULT_KEY, validate_board_key};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "taskboard";
const CONFIG_FILE: &str = "config.yaml";
const DB_FILE: &str = "taskboard.db";

/// Where the task list blob lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per key
    #[default]
    File,
    /// A row in a SQLite database
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the board's data (default: platform data dir)
    pub data_dir: Option<PathBuf>,
    pub backend: Backend,
    /// Blob key of the task list
    pub key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: Backend::File,
            key: DEFAULT_KEY.to_string(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// read if present and built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let config = Self::from_yaml(&raw).with_context(|| format!("Invalid config {:?}", path))?;
        info!(file = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty file means "all defaults"
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Failed to parse YAML config")
    }

    pub fn validate(&self) -> Result<()> {
        validate_board_key(&self.key)?;
        if self.data_dir.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
            return Err(eyre!("data_dir cannot be empty"));
        }
        Ok(())
    }

    /// Configured data directory, or the platform default
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Open the configured blob backend, creating its files if needed
    pub fn open_blob(&self) -> Result<Box<dyn BlobStore>> {
        let dir = self.data_dir();
        debug!(dir = ?dir, backend = ?self.backend, "Opening blob store");

        let blob: Box<dyn BlobStore> = match self.backend {
            Backend::File => Box::new(FileBlobStore::open(&dir)?),
            Backend::Sqlite => Box::new(SqliteBlobStore::open(dir.join(DB_FILE))?),
        };
        Ok(blob)
    }
}

/// `<config dir>/taskboard/config.yaml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

/// `<data dir>/taskboard`, falling back to `./.taskboard`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", APP_DIR)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.key, "tasks");
        assert!(config.data_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = Config::from_yaml("backend: sqlite\n").unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.key, "tasks");
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = "data_dir: /tmp/board\nbackend: file\nkey: home\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/board")));
        assert_eq!(config.key, "home");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/board"));
    }

    #[test]
    fn test_from_yaml_empty_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_from_yaml_rejects_unknown() {
        assert!(Config::from_yaml("backend: postgres\n").is_err());
        assert!(Config::from_yaml("colour: blue\n").is_err());
    }

    #[test]
    fn test_validate_key() {
        let config = Config {
            key: "bad key".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            key: "k".repeat(60),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "key: work\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.key, "work");

        assert!(Config::load(Some(temp.path().join("missing.yaml").as_path())).is_err());
    }

    #[test]
    fn test_open_blob_backends() {
        let temp = TempDir::new().unwrap();

        let file = Config {
            data_dir: Some(temp.path().join("files")),
            ..Default::default()
        };
        let mut blob = file.open_blob().unwrap();
        blob.put("tasks", "[]").unwrap();
        assert!(temp.path().join("files").join("tasks.json").exists());

        let sqlite = Config {
            data_dir: Some(temp.path().join("db")),
            backend: Backend::Sqlite,
            ..Default::default()
        };
        let mut blob = sqlite.open_blob().unwrap();
        blob.put("tasks", "[]").unwrap();
        assert!(temp.path().join("db").join(DB_FILE).exists());
    }
}
