//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use zencraft_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::{StoreConfig, ZencraftConfig};
pub use crate::logging::init_logging;

// === Items and schema ===
pub use crate::item::{Item, KnownItemType};
pub use crate::schema::{ArchetypeData, BlockData, FieldData, FieldType};

// === Queries ===
pub use crate::filter::{DbFilter, DbFilterHandler, FilterOperator, GroupOperator};
pub use crate::pagination::{DbPagination, PaginatedItemResponse, PaginationHandler, SortOrder};

// === Storage ===
pub use crate::storage::{
    open_database, ApiHandler, ApiHandlerDbInterface, AppDataSource, FileBackend, ItemDatabase, KeyValueBackend,
    LocalDbInterface, MemoryBackend, SelectMultipleOpts,
};

// === Stores ===
pub use crate::store::{GenericItemStore, ItemHandler, SaveOutcome, StoreOptions, StoreRegistry};

// === Validation, queues, seeding ===
pub use crate::queue::QueueHandler;
pub use crate::seed::{insert_all_default_items, insert_default_items};
pub use crate::validation::{validate_item, ValidationRule};

// === Error handling ===
pub use crate::Error;
