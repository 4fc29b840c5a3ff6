//! Engine configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via `--config` or `WALKV_CONFIG`)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkv_storage::{
    StoreLimits, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_VALUE_LEN, DEFAULT_SNAPSHOT_FILE,
};
use walkv_wal::DEFAULT_WAL_FILE;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "WALKV_CONFIG";

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File locations.
    pub storage: StorageConfig,
    /// Store limits.
    pub limits: LimitsConfig,
}

impl Config {
    /// Loads configuration from `path` (or `WALKV_CONFIG`), then applies
    /// environment variable overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => {
                let config = Self::from_file(&file)?;
                tracing::debug!(path = %file.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.storage.apply_overrides(&lookup);
        self.limits.apply_overrides(&lookup);
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.wal_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.wal_file must not be empty".to_string(),
            ));
        }
        if self.storage.snapshot_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.snapshot_file must not be empty".to_string(),
            ));
        }
        if self.storage.wal_file == self.storage.snapshot_file {
            return Err(ConfigError::ValidationError(
                "WAL and snapshot must be different files".to_string(),
            ));
        }
        if self.limits.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_entries must be at least 1".to_string(),
            ));
        }
        if self.limits.max_value_len == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_value_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the WAL file path.
    pub fn wal_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.wal_file)
    }

    /// Returns the snapshot file path.
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.snapshot_file)
    }

    /// Returns the store limits.
    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits::new(self.limits.max_entries, self.limits.max_value_len)
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the WAL and the snapshot.
    pub data_dir: PathBuf,
    /// WAL file name, relative to `data_dir`.
    pub wal_file: String,
    /// Snapshot file name, relative to `data_dir`.
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            wal_file: DEFAULT_WAL_FILE.to_string(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("WALKV_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup("WALKV_WAL_FILE") {
            self.wal_file = name;
        }

        if let Some(name) = lookup("WALKV_SNAPSHOT_FILE") {
            self.snapshot_file = name;
        }
    }
}

/// Store limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of keys in the store.
    pub max_entries: usize,
    /// Maximum value length in bytes.
    pub max_value_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }
}

impl LimitsConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(max) = lookup("WALKV_MAX_ENTRIES") {
            match max.parse() {
                Ok(n) => self.max_entries = n,
                Err(_) => tracing::warn!(value = %max, "ignoring invalid WALKV_MAX_ENTRIES"),
            }
        }

        if let Some(max) = lookup("WALKV_MAX_VALUE_LEN") {
            match max.parse() {
                Ok(n) => self.max_value_len = n,
                Err(_) => tracing::warn!(value = %max, "ignoring invalid WALKV_MAX_VALUE_LEN"),
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
