// crates/stash-cli/src/config.rs
// ============================================================================
// Module: Stash CLI Configuration
// Description: Configuration loading and validation for the stash CLI.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, stash-store-sqlite, thiserror, toml
// ============================================================================

//! ## Overview
//! CLI configuration is loaded from an optional TOML file with strict size
//! and path limits. An explicitly named config file must exist and parse;
//! only the implicit default file may be absent, in which case every knob
//! falls back to its default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use stash_store_sqlite::SqliteStoreMode;
use stash_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub(crate) const DEFAULT_CONFIG_NAME: &str = "stash.toml";
/// Default `SQLite` database filename when no store path is configured.
pub(crate) const DEFAULT_STORE_NAME: &str = "stash.sqlite";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "STASH_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Stash CLI configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StashConfig {
    /// Store configuration section.
    #[serde(default)]
    pub(crate) store: StoreSectionConfig,
}

/// Store section of the CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StoreSectionConfig {
    /// `SQLite` database path; the default store name is used when absent.
    #[serde(default)]
    pub(crate) path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub(crate) busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub(crate) journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub(crate) sync_mode: SqliteSyncMode,
    /// Optional value size limit forwarded to the store.
    #[serde(default)]
    pub(crate) max_value_bytes: Option<usize>,
}

impl Default for StoreSectionConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_value_bytes: None,
        }
    }
}

impl StashConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order is the explicit `path` argument, then the
    /// `STASH_CONFIG` environment variable, then `stash.toml` in the working
    /// directory. A missing default file yields the default configuration;
    /// explicit paths must load.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path)? else {
            return Ok(Self::default());
        };
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()
    }
}

impl StoreSectionConfig {
    /// Validates store section limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_store_path(path)?;
        }
        if self.max_value_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "store.max_value_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default busy timeout for configured stores.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns `None` when no explicit path is given and the default file does
/// not exist.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    if default.is_file() {
        return Ok(Some(default));
    }
    Ok(None)
}

/// Validates the resolved config path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured store path against security limits.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("store.path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store.path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("store.path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
