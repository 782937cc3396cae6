//! In-memory configuration provider

use parking_lot::RwLock;

use super::file::ConfigFile;
use super::traits::{ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<ConfigFile>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConfigFile) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn config(&self) -> ConfigResult<ConfigFile> {
        Ok(self.config.read().clone())
    }

    fn update(&self, config: ConfigFile) -> ConfigResult<()> {
        *self.config.write() = config;
        Ok(())
    }
}
