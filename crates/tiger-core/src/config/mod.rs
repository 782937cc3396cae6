//! Configuration for the CLI core
//!
//! - `FileConfigProvider`: YAML file at ~/.config/tiger/config.yaml
//! - `MemoryConfigProvider`: in-memory for testing
//!
//! `ConfigFile::with_env` layers the `TIGER_*` environment overrides on top.

mod traits;
mod memory;
mod file;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use memory::MemoryConfigProvider;
pub use file::{
    ConfigFile, FileConfigProvider, DEFAULT_WAIT_TIMEOUT,
    ENV_PASSWORD_STORAGE, ENV_PROJECT_ID, ENV_SERVICE_ID,
};
