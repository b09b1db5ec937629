//! Zencraft Core
//!
//! A schema-driven item store for content-management applications.
//!
//! # Overview
//!
//! Everything in Zencraft is an [`Item`](item::Item): a UUID-identified record
//! with a `typeId` discriminator and arbitrary fields. Fields, archetypes,
//! blocks and pages are items too, so the whole CMS is described by its own
//! data. This crate provides the layer underneath: a filter/pagination query
//! model, storage adapters, and a generic per-item-type store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use zencraft_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ZencraftConfig::load()?;
//!     zencraft_core::logging::init_logging(&config.logging)?;
//!
//!     let db = Arc::new(LocalDbInterface::in_memory(&config.storage.db_name));
//!     let registry = StoreRegistry::new(db, config.store.clone());
//!
//!     let pages = registry.store_for(KnownItemType::Page.as_str());
//!     pages.load_all_items().await;
//!     for page in pages.all_items() {
//!         log::info!("page {}", page.id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`item`] - Item records, known item types, shallow merge
//! - [`schema`] - Typed views over fields, archetypes and blocks
//! - [`filter`] - Predicate trees evaluated against records
//! - [`pagination`] - Page bookkeeping and paginated responses
//! - [`storage`] - The `ItemDatabase` trait and its local/REST adapters
//! - [`store`] - Generic item store, handlers, write queue, store registry
//! - [`validation`] - Declarative field validation rules
//! - [`queue`] - Key-value backed polling queues
//! - [`seed`] - Default data import

pub mod config; // Configuration system with TOML support
pub mod filter;
pub mod item;
pub mod logging; // env_logger setup for the `log` facade
pub mod pagination;
pub mod queue;
pub mod schema;
pub mod seed;
pub mod storage;
pub mod store;
pub mod validation;

// Prelude module for convenient imports
pub mod prelude;

pub use config::ZencraftConfig;
pub use filter::{DbFilter, DbFilterHandler, FilterOperator};
pub use item::{Item, KnownItemType};
pub use pagination::{DbPagination, PaginatedItemResponse, PaginationHandler};
pub use storage::{ApiHandlerDbInterface, ItemDatabase, LocalDbInterface};
pub use store::{GenericItemStore, ItemHandler, StoreRegistry};

// Main result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Zencraft
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An id that is not a UUID where one is required
    #[error("Invalid item id: {0}")]
    InvalidId(String),
    /// Malformed arguments (empty item type, non-object data, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Key-value backend or table failures
    #[error("Storage error: {0}")]
    Storage(String),
    /// Non-success answers from the REST backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
