use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Priority;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Empty means the profile's default location
    #[serde(default)]
    pub database_path: String,
    /// Empty means the profile's data directory
    #[serde(default)]
    pub backup_directory: String,
    #[serde(default)]
    pub default_priority: Priority,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            backup_directory: String::new(),
            default_priority: Priority::default(),
            log_filter: default_log_filter(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from `path`, writing a default file first if it is missing.
    ///
    /// The flag is true when the default file was created by this call. Nothing
    /// is logged here since this runs before the log subscriber is installed.
    pub fn load_or_create(path: &Path, profile: utils::Profile) -> Result<(Self, bool), ConfigError> {
        let (mut config, created) = if path.exists() {
            (Self::read_file(path)?, false)
        } else {
            let mut config = Config::default();
            config.save_to_path(path)?;
            (config, true)
        };
        config.fill_profile_paths(profile);
        Ok((config, created))
    }

    /// Load configuration from an explicit file; the file must exist
    pub fn load_from_path(path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.fill_profile_paths(profile);
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Resolve empty paths to the profile defaults
    fn fill_profile_paths(&mut self, profile: utils::Profile) {
        if self.database_path.trim().is_empty() {
            self.database_path = Self::default_database_path_for_profile(profile);
        }
        if self.backup_directory.trim().is_empty() {
            self.backup_directory = Self::default_backup_directory_for_profile(profile);
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("studylog.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/studylog-dev/studylog.db".to_string(),
                utils::Profile::Prod => "~/.local/share/studylog/studylog.db".to_string(),
            }
        }
    }

    fn default_backup_directory_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("backups").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/studylog-dev/backups".to_string(),
                utils::Profile::Prod => "~/.local/share/studylog/backups".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Get the expanded backup directory (with ~ expansion)
    pub fn get_backup_directory(&self) -> PathBuf {
        utils::expand_path(&self.backup_directory)
    }
}
