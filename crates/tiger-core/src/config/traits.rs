//! Configuration provider trait

use super::file::ConfigFile;

/// Source of the CLI configuration
///
/// Implementations:
/// - `FileConfigProvider`: YAML file (~/.config/tiger/config.yaml)
/// - `MemoryConfigProvider`: in-memory for testing
pub trait ConfigProvider: Send + Sync {
    /// Current configuration, as stored (no environment overrides)
    fn config(&self) -> ConfigResult<ConfigFile>;

    /// Replace the stored configuration
    fn update(&self, config: ConfigFile) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Cannot locate a config or home directory")]
    NoConfigDir,

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
