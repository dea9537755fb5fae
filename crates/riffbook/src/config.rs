//! Layered configuration for riffbook.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`RIFFBOOK_*`, `__` between section and key)
//! 2. `config.toml` in the riffbook config directory, or the `--config` file
//! 3. Built-in defaults
//!
//! `RIFFBOOK_USER__EMAIL` sets `user.email`, `RIFFBOOK_STORAGE__APP_ID` sets
//! `storage.app_id`, and so on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_DIR: &str = "riffbook";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "tracker.db";
const ENV_PREFIX: &str = "RIFFBOOK_";

/// Application id used when none is configured.
pub const DEFAULT_APP_ID: &str = "guitar-tracker-default";

/// Everything riffbook reads from its configuration sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where documents live.
    pub storage: StorageConfig,
    /// The user the tracker acts for.
    pub user: UserConfig,
    /// CSV export settings.
    pub export: ExportConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; unset means `tracker.db` in the local data directory.
    pub database_path: Option<PathBuf>,
    /// Application id; documents are keyed by `(app_id, user_id)`.
    pub app_id: String,
    /// How often subscriptions check for writes from other processes.
    pub poll_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            app_id: DEFAULT_APP_ID.to_string(),
            poll_interval_ms: 1_000,
        }
    }
}

impl StorageConfig {
    fn check(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(invalid("storage.app_id must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("storage.poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

/// `[user]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Stable user identifier.
    pub id: String,
    /// Email address, used in export file names.
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "local".to_string(),
            email: String::new(),
        }
    }
}

impl UserConfig {
    fn check(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(invalid("user.id must not be empty"));
        }
        Ok(())
    }
}

/// `[export]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory CSV exports are written to; unset means the working directory.
    pub directory: Option<PathBuf>,
}

fn invalid(message: &str) -> Error {
    Error::ConfigValidation {
        message: message.to_string(),
    }
}

impl Config {
    /// Load from the default config file and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigLoad` if a source cannot be parsed, or
    /// `ConfigValidation` if the merged values are unusable.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`Config::load`], reading `path` instead of the default file.
    ///
    /// A missing file is not an error; defaults and the environment apply.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(Self::default_config_path);
        let config: Self = Self::figment(&path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider chain behind [`Config::load_from`].
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `config.toml` under the platform config directory.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// riffbook's directory under the platform local data directory.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR)
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.storage.check()?;
        self.user.check()
    }

    /// The configured database file, or the default one.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        match &self.storage.database_path {
            Some(path) => path.clone(),
            None => Self::default_data_dir().join(DATABASE_FILE),
        }
    }

    /// The configured export directory, or `.`.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// [`StorageConfig::poll_interval_ms`] as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.storage.poll_interval_ms)
    }
}
