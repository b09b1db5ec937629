//! Item store configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Quiet period before queued field edits are applied, in milliseconds
    pub dirty_debounce_ms: u64,

    /// Page size of exhaustive loads from local tables
    pub local_page_size: u32,

    /// Page size of exhaustive loads over the REST API
    pub api_page_size: u32,

    /// Page size of a `load_multiple` batch
    pub load_multiple_page_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dirty_debounce_ms: 250,
            local_page_size: 200,
            api_page_size: 50,
            load_multiple_page_size: 100,
        }
    }
}

impl StoreConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {}

    pub fn validate(&self) -> Result<()> {
        if self.local_page_size == 0 || self.api_page_size == 0 || self.load_multiple_page_size == 0 {
            bail!("store page sizes must be greater than 0");
        }
        Ok(())
    }
}
