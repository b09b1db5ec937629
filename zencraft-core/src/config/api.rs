//! REST API configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the item routes are resolved against
    /// Env: ZC_API_URL
    /// Default: "http://localhost:4000"
    pub base_url: String,

    /// Bearer token sent with every request
    /// Env: ZC_JWT
    /// Default: None (falls back to the stored login token)
    pub jwt: Option<String>,

    /// Request timeout in seconds
    /// Default: 30
    pub timeout_secs: u64,

    /// Log every request and its outcome
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            jwt: None,
            timeout_secs: 30,
            debug: false,
        }
    }
}

impl ApiConfig {
    pub fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        if other.jwt.is_some() {
            self.jwt = other.jwt;
        }
        self.timeout_secs = other.timeout_secs;
        self.debug = other.debug;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = env::var("ZC_API_URL") {
            self.base_url = url;
        }

        if let Ok(jwt) = env::var("ZC_JWT") {
            if !jwt.trim().is_empty() {
                self.jwt = Some(jwt);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("api.base_url must be an http(s) URL, got '{}'", self.base_url);
        }
        if self.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than 0");
        }
        Ok(())
    }
}
