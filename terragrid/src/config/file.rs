//! Loading and saving ~/.terragrid/config.ini.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::column::ColumnCacheConfig;
use crate::coord::CoordError;
use crate::dataop::MemoConfig;
use crate::world::WorldScale;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Loads from the default path, falling back to defaults if it is missing.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Writes the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Writes a default config file unless one exists. Returns its path.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    pub fn world_scale(&self) -> Result<WorldScale, CoordError> {
        WorldScale::new(self.world.meters_per_block)
    }

    pub fn memo_config(&self) -> MemoConfig {
        MemoConfig {
            capacity: self.cache.memo_capacity,
            time_to_idle: Duration::from_secs(self.cache.memo_ttl_secs),
        }
    }

    pub fn column_cache_config(&self) -> ColumnCacheConfig {
        ColumnCacheConfig {
            capacity: self.cache.column_capacity,
            ttl: Duration::from_secs(self.cache.column_ttl_secs),
        }
    }
}

/// The config directory (~/.terragrid).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".terragrid")
}

/// The config file (~/.terragrid/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.world.meters_per_block, crate::world::DEFAULT_METERS_PER_BLOCK);
        assert_eq!(config.cache.column_ttl_secs, DEFAULT_COLUMN_TTL_SECS);
        assert!(config.pool.cpu_threads >= 1);
        assert!(config.remote.index_url.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_derived_configs() {
        let mut config = ConfigFile::default();
        config.cache.memo_capacity = 9;
        config.cache.memo_ttl_secs = 3;
        config.cache.column_capacity = 12;

        assert_eq!(config.memo_config().capacity, 9);
        assert_eq!(config.memo_config().time_to_idle, Duration::from_secs(3));
        assert_eq!(config.column_cache_config().capacity, 12);
        assert_eq!(config.world_scale().unwrap().meters_per_block(), 30.0);
    }

    #[test]
    fn test_config_paths() {
        assert!(config_file_path().ends_with(".terragrid/config.ini"));
    }
}
