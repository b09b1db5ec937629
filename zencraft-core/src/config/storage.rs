//! Storage configuration

use crate::storage::AppDataSource;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the local tables
    /// Env: ZC_DATA_DIR
    /// Default: "./data"
    pub data_dir: PathBuf,

    /// Database name, part of every table key
    /// Default: "ItemDatabase"
    pub db_name: String,

    /// Forces a data source instead of the persisted choice
    /// Env: ZC_DATA_SOURCE ("api" or "local")
    /// Default: None
    pub data_source: Option<AppDataSource>,

    /// Artificial delay before local table operations, in milliseconds
    /// Default: 0
    pub write_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_name: crate::storage::local::DEFAULT_DB_NAME.to_string(),
            data_source: None,
            write_delay_ms: 0,
        }
    }
}

impl StorageConfig {
    pub fn merge(&mut self, other: Self) {
        self.data_dir = other.data_dir;
        self.db_name = other.db_name;
        if other.data_source.is_some() {
            self.data_source = other.data_source;
        }
        self.write_delay_ms = other.write_delay_ms;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(dir) = env::var("ZC_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(source) = env::var("ZC_DATA_SOURCE") {
            match source.parse() {
                Ok(s) => self.data_source = Some(s),
                Err(e) => log::warn!("Ignoring ZC_DATA_SOURCE: {}", e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.db_name.trim().is_empty() {
            bail!("storage.db_name must not be empty");
        }
        if self.data_dir.as_os_str().is_empty() {
            bail!("storage.data_dir must not be empty");
        }
        Ok(())
    }
}
