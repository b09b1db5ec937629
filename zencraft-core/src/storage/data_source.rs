//! Data source selection
//!
//! The active source is persisted under the `data_source` key of the local
//! key-value backend so every tool sharing a data directory agrees on it.

use super::{ApiHandler, ApiHandlerDbInterface, ItemDatabase, KeyValueBackend, LocalDbInterface};
use crate::config::ZencraftConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DATA_SOURCE_KEY: &str = "data_source";
pub const JWT_KEY: &str = "jwt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppDataSource {
    Api,
    /// Local JSON-array tables
    #[default]
    Local,
}

impl AppDataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppDataSource::Api => "api",
            AppDataSource::Local => "local",
        }
    }

    pub fn is_api(&self) -> bool {
        matches!(self, AppDataSource::Api)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AppDataSource::Local)
    }
}

impl fmt::Display for AppDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppDataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(AppDataSource::Api),
            // `indexedDb` is what the browser build stores
            "local" | "indexeddb" => Ok(AppDataSource::Local),
            other => Err(Error::InvalidInput(format!("unknown data source: {}", other))),
        }
    }
}

/// Read the persisted data source
///
/// A missing or unknown value resets the key to [`AppDataSource::Local`].
pub async fn check_data_source(backend: &dyn KeyValueBackend) -> Result<AppDataSource> {
    let stored = backend.get(DATA_SOURCE_KEY).await?;
    match stored.as_deref().map(AppDataSource::from_str) {
        Some(Ok(source)) => Ok(source),
        _ => {
            if let Some(value) = stored {
                log::warn!("Unknown data source '{}', falling back to local", value);
            }
            backend.set(DATA_SOURCE_KEY, AppDataSource::Local.to_string()).await?;
            Ok(AppDataSource::Local)
        }
    }
}

pub async fn set_data_source(backend: &dyn KeyValueBackend, source: AppDataSource) -> Result<()> {
    backend.set(DATA_SOURCE_KEY, source.to_string()).await?;
    log::info!("Data source set to {}", source);
    Ok(())
}

/// The JWT saved by a previous login, if any
pub async fn stored_jwt(backend: &dyn KeyValueBackend) -> Result<Option<String>> {
    Ok(backend.get(JWT_KEY).await?.filter(|t| !t.trim().is_empty()))
}

pub async fn store_jwt(backend: &dyn KeyValueBackend, jwt: &str) -> Result<()> {
    backend.set(JWT_KEY, jwt.to_string()).await
}

/// Build the adapter for the configured data source
///
/// `config.storage.data_source` wins over the persisted choice. The REST
/// adapter falls back to the stored JWT when the config carries none.
pub async fn open_database(config: &ZencraftConfig) -> Result<Arc<dyn ItemDatabase>> {
    let local = LocalDbInterface::open_dir(&config.storage.db_name, &config.storage.data_dir)?
        .with_write_delay(Duration::from_millis(config.storage.write_delay_ms));
    let backend = local.backend();

    let source = match config.storage.data_source {
        Some(source) => source,
        None => check_data_source(backend.as_ref()).await?,
    };
    log::info!("Opening {} item database", source);

    match source {
        AppDataSource::Local => Ok(Arc::new(local)),
        AppDataSource::Api => {
            let api = ApiHandler::from_config(&config.api)?;
            if config.api.jwt.is_none() {
                if let Some(jwt) = stored_jwt(backend.as_ref()).await? {
                    api.set_token(jwt);
                }
            }
            Ok(Arc::new(ApiHandlerDbInterface::new(Arc::new(api))))
        }
    }
}
