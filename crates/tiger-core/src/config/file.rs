//! File-based configuration provider (YAML)
//!
//! The user-level config lives at ~/.config/tiger/config.yaml. A handful of
//! `TIGER_*` environment variables override what the file says.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::secrets::{create_secret_store, PasswordStorage, SecretStore};
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

pub const ENV_PASSWORD_STORAGE: &str = "TIGER_PASSWORD_STORAGE";
pub const ENV_PROJECT_ID: &str = "TIGER_PROJECT_ID";
pub const ENV_SERVICE_ID: &str = "TIGER_SERVICE_ID";

/// Used when the config does not set `wait_timeout_secs`
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Where database passwords are kept
    #[serde(default)]
    pub password_storage: PasswordStorage,

    /// Default project for commands that take one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Default service for commands that take one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WAIT_TIMEOUT)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// Empty values are ignored so that `TIGER_SERVICE_ID=` does not clear a
    /// configured default.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_PASSWORD_STORAGE) {
            self.password_storage = value.parse().map_err(|message| ConfigError::Invalid {
                key: ENV_PASSWORD_STORAGE.to_string(),
                message,
            })?;
        }
        if let Some(value) = get(ENV_PROJECT_ID) {
            self.project_id = Some(value);
        }
        if let Some(value) = get(ENV_SERVICE_ID) {
            self.service_id = Some(value);
        }
        Ok(self)
    }

    /// Build the password store this config selects
    pub fn secret_store(&self) -> Arc<dyn SecretStore> {
        create_secret_store(self.password_storage)
    }
}

/// File-based configuration provider
///
/// # Example
///
/// ```no_run
/// use tiger_core::config::FileConfigProvider;
///
/// let provider = FileConfigProvider::user()?;
/// let config = provider.load()?.with_env()?;
/// let store = config.secret_store();
/// # Ok::<(), tiger_core::config::ConfigError>(())
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/tiger/config.yaml)
    pub fn user() -> ConfigResult<Self> {
        Self::under(dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config"))))
    }

    fn under(config_dir: Option<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(config_dir.join("tiger").join("config.yaml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_file(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Cached config, reading the file on first use
    ///
    /// A missing file yields the defaults.
    pub fn load(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.read_file()?;
        *self.cache.write() = Some(config.clone());
        tracing::debug!(path = %self.path.display(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        tracing::debug!(path = %self.path.display(), "saved config");
        Ok(())
    }

    /// Copy the current file next to itself as `config.yaml.backup`
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

impl ConfigProvider for FileConfigProvider {
    fn config(&self) -> ConfigResult<ConfigFile> {
        self.load()
    }

    fn update(&self, config: ConfigFile) -> ConfigResult<()> {
        self.save(&config)
    }
}
