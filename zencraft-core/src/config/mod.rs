//! Configuration system for Zencraft
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** - fields set on the loaded struct
//! 2. **Environment Variables** (`ZC_*`) - Override file config
//! 3. **Config File** (zencraft.toml) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use zencraft_core::config::ZencraftConfig;
//!
//! let mut config = ZencraftConfig::load()?;
//! config.store.dirty_debounce_ms = 100;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod logging;
pub mod storage;
pub mod store;

pub use api::ApiConfig;
pub use logging::LoggingConfig;
pub use storage::StorageConfig;
pub use store::StoreConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "zencraft.toml";

/// Complete Zencraft configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZencraftConfig {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl ZencraftConfig {
    /// Load `zencraft.toml` from the working directory, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.storage.merge(other.storage);
        self.api.merge(other.api);
        self.store.merge(other.store);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.storage.apply_env_vars();
        self.api.apply_env_vars();
        self.store.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.api.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
