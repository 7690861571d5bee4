//! Configuration management for AskBridge
//!
//! Settings live in `.askbridge/config.toml` under the project root. Every
//! field has a default, so a missing file or a partial file both load.

use crate::chunker::DEFAULT_MAX_CHUNK_CHARS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project configuration directory
pub const CONFIG_DIR_NAME: &str = ".askbridge";

/// Errors that can occur during configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error while reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Assistant CLI settings
    #[serde(default)]
    pub cli: CliConfig,

    /// Change mode pagination and caching
    #[serde(default)]
    pub change_mode: ChangeModeConfig,

    /// Project root the config was loaded from
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

/// Settings for the external assistant CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Executable name or path
    #[serde(default = "default_command")]
    pub command: String,

    /// Model used when a request names none; empty defers to the CLI's own
    /// default
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model retried once when the default model's quota is exhausted
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
}

fn default_command() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_fallback_model() -> String {
    "gemini-3-flash".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            default_model: default_model(),
            fallback_model: default_fallback_model(),
        }
    }
}

/// Change mode settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeModeConfig {
    /// Page budget in estimated characters
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// How long cached edit sets stay fetchable
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached edit sets
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_max_cache_entries() -> usize {
    64
}

impl Default for ChangeModeConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_cache_entries: default_max_cache_entries(),
        }
    }
}

impl Config {
    /// Load configuration from a project root, falling back to defaults when
    /// no config file exists
    pub fn load<P: AsRef<Path>>(project_root: P) -> Result<Self, ConfigError> {
        let config_path = project_root.as_ref().join(CONFIG_DIR_NAME).join("config.toml");

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&contents)?
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Config::default()
        };
        config.root = Some(project_root.as_ref().to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Save configuration under a project root
    pub fn save<P: AsRef<Path>>(&self, project_root: P) -> Result<(), ConfigError> {
        let config_dir = project_root.as_ref().join(CONFIG_DIR_NAME);

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join("config.toml"), contents)?;

        Ok(())
    }

    /// Reject settings the change mode pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cli.command.trim().is_empty() {
            return Err(ConfigError::Invalid("cli.command must not be empty".to_string()));
        }
        if self.change_mode.max_chunk_chars == 0 {
            return Err(ConfigError::Invalid(
                "change_mode.max_chunk_chars must be greater than zero".to_string(),
            ));
        }
        if self.change_mode.cache_ttl_secs == 0 || self.change_mode.max_cache_entries == 0 {
            return Err(ConfigError::Invalid(
                "change_mode cache limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(CONFIG_DIR_NAME))
    }
}
