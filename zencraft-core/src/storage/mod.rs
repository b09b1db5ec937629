//! Storage adapters
//!
//! Every backend implements [`ItemDatabase`]. Two adapters ship with the crate:
//!
//! - [`LocalDbInterface`]: JSON-array tables in a [`KeyValueBackend`]
//! - [`ApiHandlerDbInterface`]: a proxy to the REST backend
//!
//! Adapters return typed errors; the store layer decides whether a failure
//! degrades to an empty result.

pub mod api;
pub mod backend;
pub mod data_source;
pub mod local;

pub use api::{ApiHandler, ApiHandlerDbInterface, ApiResponse, ApiResult, ResultNotice};
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use data_source::{open_database, AppDataSource};
pub use local::{LocalDbInterface, LocalTable};

use crate::filter::DbFilter;
use crate::item::Item;
use crate::pagination::{DbPagination, PaginatedItemResponse};
use crate::Result;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Arguments of [`ItemDatabase::select_multiple`]
#[derive(Debug, Clone, Default)]
pub struct SelectMultipleOpts {
    pub item_type: String,
    /// Restrict to these ids when set
    pub item_ids: Option<Vec<Uuid>>,
    pub filters: Vec<DbFilter>,
    /// Without pagination every match is returned
    pub pagination: Option<DbPagination>,
}

impl SelectMultipleOpts {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self { item_type: item_type.into(), ..Default::default() }
    }

    pub fn with_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.item_ids = Some(ids);
        self
    }

    pub fn with_filters(mut self, filters: Vec<DbFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_pagination(mut self, pagination: DbPagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// CRUD surface shared by every storage backend
#[async_trait::async_trait]
pub trait ItemDatabase: Send + Sync {
    /// Which data source this adapter talks to
    fn source(&self) -> AppDataSource;

    /// Add an item unless one with this id already exists
    async fn insert(&self, item_id: Uuid, item_type: &str, data: Map<String, Value>) -> Result<()>;

    async fn insert_multiple(&self, item_type: &str, items: Vec<(Uuid, Map<String, Value>)>) -> Result<()> {
        for (item_id, data) in items {
            self.insert(item_id, item_type, data).await?;
        }
        Ok(())
    }

    /// Shallow-merge `data` into an item, creating it when absent
    async fn update(
        &self,
        item_id: Uuid,
        item_type: &str,
        data: Map<String, Value>,
        set_updated: bool,
    ) -> Result<()>;

    async fn update_multiple(&self, item_type: &str, items: Vec<(Uuid, Map<String, Value>)>) -> Result<()> {
        for (item_id, data) in items {
            self.update(item_id, item_type, data, false).await?;
        }
        Ok(())
    }

    async fn select(&self, item_id: Uuid, item_type: &str) -> Result<Option<Item>>;

    async fn select_multiple(&self, opts: SelectMultipleOpts) -> Result<PaginatedItemResponse>;

    async fn remove(&self, item_id: Uuid, item_type: &str) -> Result<()>;

    async fn remove_multiple(&self, item_type: &str, item_ids: &[Uuid]) -> Result<()> {
        for item_id in item_ids {
            self.remove(*item_id, item_type).await?;
        }
        Ok(())
    }
}

pub(crate) fn require_item_type(item_type: &str) -> Result<()> {
    if item_type.trim().is_empty() {
        return Err(crate::Error::InvalidInput("item type must not be empty".to_string()));
    }
    Ok(())
}
