//! Generic item store
//!
//! One [`GenericItemStore`] serves one item type. It caches items and their
//! handlers, loads and searches through an [`ItemDatabase`], and keeps the
//! cache in step with handler edits through a [`DirtyFieldQueue`].
//!
//! Read operations (`load_item`, `search_items`, ...) degrade to `None` or an
//! empty page when storage fails, logging the error. Their `try_*` variants
//! return the error instead.

pub mod handler;
pub mod registry;
pub mod write_queue;

pub use handler::{DirtyFieldHook, ItemHandler};
pub use registry::{map_item_ids_to_items, StoreRegistry};
pub use write_queue::{DirtyFieldQueue, PendingWrite};

use crate::config::StoreConfig;
use crate::filter::{DbFilter, FilterOperator};
use crate::item::{current_second, Item, KnownItemType};
use crate::pagination::{DbPagination, PaginatedItemResponse, PaginationHandler};
use crate::storage::{AppDataSource, ItemDatabase, SelectMultipleOpts};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use uuid::Uuid;

/// Decides whether an item may enter the store cache
pub type ItemValidator = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct StoreOptions {
    pub item_type: String,
    pub store_name: String,
    /// Sync every handler handed out, not only those requested with `sync`
    pub sync_handlers: bool,
    pub validator: Option<ItemValidator>,
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("item_type", &self.item_type)
            .field("store_name", &self.store_name)
            .field("sync_handlers", &self.sync_handlers)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl StoreOptions {
    /// Options named after the item type, e.g. `pageStore` for `Page`
    pub fn new(item_type: impl Into<String>) -> Self {
        let item_type = item_type.into();
        let mut chars = item_type.chars();
        let store_name = match chars.next() {
            Some(first) => format!("{}{}Store", first.to_ascii_lowercase(), chars.as_str()),
            None => "store".to_string(),
        };
        Self { item_type, store_name, sync_handlers: false, validator: None }
    }

    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }

    pub fn with_sync_handlers(mut self, sync: bool) -> Self {
        self.sync_handlers = sync;
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&Item) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

/// Result of [`GenericItemStore::save_item`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(Item),
    /// The stored item has another type; nothing was written
    TypeMismatch { expected: String, actual: String },
}

struct StoreInner {
    options: StoreOptions,
    config: StoreConfig,
    db: Arc<dyn ItemDatabase>,
    items: RwLock<BTreeMap<Uuid, Item>>,
    handlers: RwLock<HashMap<Uuid, Arc<ItemHandler>>>,
    last_update: AtomicI64,
    queue: DirtyFieldQueue,
}

/// Cache and CRUD surface for one item type
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct GenericItemStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for GenericItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericItemStore")
            .field("options", &self.inner.options)
            .field("items", &self.len())
            .finish()
    }
}

impl GenericItemStore {
    pub fn new(db: Arc<dyn ItemDatabase>, options: StoreOptions) -> Self {
        Self::with_config(db, options, StoreConfig::default())
    }

    pub fn with_config(db: Arc<dyn ItemDatabase>, options: StoreOptions, config: StoreConfig) -> Self {
        let queue = DirtyFieldQueue::new(Duration::from_millis(config.dirty_debounce_ms));
        Self {
            inner: Arc::new(StoreInner {
                options,
                config,
                db,
                items: RwLock::new(BTreeMap::new()),
                handlers: RwLock::new(HashMap::new()),
                last_update: AtomicI64::new(0),
                queue,
            }),
        }
    }

    pub fn item_type(&self) -> &str {
        &self.inner.options.item_type
    }

    pub fn store_name(&self) -> &str {
        &self.inner.options.store_name
    }

    pub fn db(&self) -> Arc<dyn ItemDatabase> {
        self.inner.db.clone()
    }

    // Cache access

    pub fn all_items(&self) -> Vec<Item> {
        self.inner.items.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    pub fn all_item_ids(&self) -> Vec<Uuid> {
        self.inner.items.read().unwrap_or_else(PoisonError::into_inner).keys().copied().collect()
    }

    pub fn get_item(&self, id: Uuid) -> Option<Item> {
        self.inner.items.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unix second of the last cache write, 0 before any
    pub fn last_update(&self) -> i64 {
        self.inner.last_update.load(Ordering::SeqCst)
    }

    pub fn is_valid_item(&self, item: &Item) -> bool {
        self.inner.options.validator.as_ref().map_or(true, |validate| validate(item))
    }

    pub fn set_items(&self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.set_item(item);
        }
    }

    /// Cache an item; returns false when the validator rejects it
    pub fn set_item(&self, item: Item) -> bool {
        if !self.is_valid_item(&item) {
            log::debug!("Invalid item for {}: {}", self.store_name(), item.id);
            return false;
        }
        self.inner.items.write().unwrap_or_else(PoisonError::into_inner).insert(item.id, item);
        self.inner.last_update.store(current_second(), Ordering::SeqCst);
        true
    }

    /// Change an existing property of a cached item
    ///
    /// Returns false when the item is not cached or has no such property.
    /// Metadata keys (`typeId`, `createdAt`, ...) always exist.
    pub fn set_item_property(&self, id: Uuid, prop: &str, value: Value) -> bool {
        self.write_property(id, prop, value, false)
    }

    fn write_property(&self, id: Uuid, prop: &str, value: Value, create: bool) -> bool {
        let mut items = self.inner.items.write().unwrap_or_else(PoisonError::into_inner);
        let Some(item) = items.get_mut(&id) else {
            return false;
        };
        let exists = Item::is_metadata_key(prop) || item.fields.contains_key(prop);
        if !exists && !create {
            log::debug!("{} has no property {}", id, prop);
            return false;
        }
        if let Err(e) = item.set(prop, value) {
            log::warn!("Cannot set {} on {}: {}", prop, id, e);
            return false;
        }
        drop(items);
        self.inner.last_update.store(current_second(), Ordering::SeqCst);
        true
    }

    /// Forget an item and its handler
    pub fn evict(&self, id: Uuid) {
        self.inner.items.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
        self.evict_handler(id);
        self.inner.queue.discard(id);
    }

    fn evict_handler(&self, id: Uuid) {
        self.inner.handlers.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    // Handlers

    /// Cached handler for an item, created on first use
    ///
    /// Handlers are shared: asking for a synced handler once makes every user
    /// of that handler sync with the store. Use [`get_custom_handler`] for a
    /// private one.
    ///
    /// [`get_custom_handler`]: GenericItemStore::get_custom_handler
    pub fn get_handler(&self, id: Uuid, sync: bool) -> Arc<ItemHandler> {
        let cached = self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned();
        if let Some(handler) = cached {
            if sync || self.inner.options.sync_handlers {
                handler.set_on_dirty_field(Some(self.dirty_hook()));
            }
            return handler;
        }

        let handler = self.get_custom_handler(id, sync);
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert(handler)
            .clone()
    }

    /// Fresh handler seeded from the cache, never cached itself
    pub fn get_custom_handler(&self, id: Uuid, sync: bool) -> Arc<ItemHandler> {
        let handler = Arc::new(ItemHandler::new(id, self.item_type(), self.inner.db.clone()));
        if sync || self.inner.options.sync_handlers {
            handler.set_on_dirty_field(Some(self.dirty_hook()));
        }
        if let Some(item) = self.get_item(id) {
            handler.replace_data(item);
        }
        handler
    }

    fn dirty_hook(&self) -> DirtyFieldHook {
        // Weak, since the handler cache lives inside the store
        let inner: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Arc::new(move |item_id: Uuid, item_type: &str, field: &str, value: &Value| {
            if let Some(inner) = inner.upgrade() {
                GenericItemStore { inner }.update_on_handler_change(item_id, item_type, field, value.clone());
            }
        })
    }

    /// Push data into an item's handler
    pub fn set_data(&self, id: Uuid, data: &Map<String, Value>) -> Result<()> {
        self.get_handler(id, false).set_data(data)
    }

    /// Queue a handler field change for the cache
    ///
    /// Inside a Tokio runtime a flush is scheduled once writes have been
    /// quiet for the debounce delay. Call [`flush`](GenericItemStore::flush)
    /// to apply pending writes immediately.
    pub fn update_on_handler_change(&self, item_id: Uuid, item_type: &str, field: &str, value: Value) {
        let generation = self.inner.queue.push(PendingWrite {
            item_id,
            item_type: item_type.to_string(),
            field: field.to_string(),
            value,
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner = Arc::downgrade(&self.inner);
        let delay = self.inner.queue.debounce();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                if inner.queue.is_latest(generation) {
                    GenericItemStore { inner }.flush();
                }
            }
        });
    }

    /// Apply every pending field write to the cache
    ///
    /// Handler edits may add fields the cached item lacks. Writes for items
    /// that are not cached are dropped. Returns the number of writes applied.
    pub fn flush(&self) -> usize {
        self.inner
            .queue
            .drain()
            .into_iter()
            .filter(|write| self.write_property(write.item_id, &write.field, write.value.clone(), true))
            .count()
    }

    pub fn pending_writes(&self) -> usize {
        self.inner.queue.len()
    }

    // Loading

    pub async fn load_item(&self, id: Uuid, force: bool) -> Option<Item> {
        match self.try_load_item(id, force).await {
            Ok(item) => item,
            Err(e) => {
                log::error!("Failed to load item {}: {}", id, e);
                None
            }
        }
    }

    /// Cached item unless `force`, else fetched through its handler
    pub async fn try_load_item(&self, id: Uuid, force: bool) -> Result<Option<Item>> {
        if !force {
            if let Some(item) = self.get_item(id) {
                return Ok(Some(item));
            }
        }

        let handler = self.get_handler(id, false);
        match handler.load().await? {
            Some(_) => {
                self.set_item(handler.get_data());
                Ok(self.get_item(id))
            }
            None => {
                self.evict_handler(id);
                log::info!("Item {} ({}) does not exist", id, self.item_type());
                Ok(None)
            }
        }
    }

    /// Load several items with one search
    ///
    /// Cached ids are skipped unless `force`. With nothing left to fetch the
    /// result is empty and storage is not queried.
    pub async fn load_multiple(&self, ids: &[Uuid], force: bool) -> PaginatedItemResponse {
        let ids_to_find: Vec<Uuid> = if force {
            ids.to_vec()
        } else {
            ids.iter().copied().filter(|id| self.get_item(*id).is_none()).collect()
        };

        if ids_to_find.is_empty() {
            return PaginatedItemResponse::default();
        }

        let ids: Vec<Value> = ids_to_find.iter().map(|id| Value::String(id.to_string())).collect();
        let filters = vec![DbFilter::single("itemId", FilterOperator::In, ids)];
        let pagination = DbPagination::page(1, self.inner.config.load_multiple_page_size);
        self.search_items(filters, Some(pagination)).await
    }

    /// Load every item of this type, page by page; returns the cache size
    pub async fn load_all_items(&self) -> usize {
        let page_size = match self.inner.db.source() {
            AppDataSource::Local => self.inner.config.local_page_size,
            AppDataSource::Api => self.inner.config.api_page_size,
        };
        let mut ph = PaginationHandler::with_page_size(page_size);
        let store_name = self.store_name().to_string();

        self.for_each_page(&mut ph, vec![self.item_type_filter()], |res| {
            log::debug!(
                "{}: loaded page {} ({} of {} items)",
                store_name,
                res.pagination.page,
                res.results.len(),
                res.total_items
            );
        })
        .await;

        self.len()
    }

    /// Search page after page until storage reports no more results
    pub async fn for_each_page<F>(&self, ph: &mut PaginationHandler, filters: Vec<DbFilter>, mut with_result: F)
    where
        F: FnMut(&PaginatedItemResponse) + Send,
    {
        loop {
            let res = self.search_items(filters.clone(), Some(ph.pagination.clone())).await;
            with_result(&res);
            ph.set_total(res.total_items);

            if !res.has_more || ph.is_done() {
                break;
            }
            ph.increment_page();
        }
    }

    pub fn item_type_filter(&self) -> DbFilter {
        DbFilter::single("typeId", FilterOperator::IsEqual, self.item_type())
    }

    pub async fn search_items(
        &self,
        filters: Vec<DbFilter>,
        pagination: Option<DbPagination>,
    ) -> PaginatedItemResponse {
        match self.try_search_items(filters, pagination.clone()).await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Search failed in {}: {}", self.store_name(), e);
                PaginatedItemResponse::empty(pagination.unwrap_or_default())
            }
        }
    }

    /// Search storage and cache every valid result
    ///
    /// The store's type filter is added unless the store serves `Item` or a
    /// `typeId` filter is already present.
    pub async fn try_search_items(
        &self,
        mut filters: Vec<DbFilter>,
        pagination: Option<DbPagination>,
    ) -> Result<PaginatedItemResponse> {
        let item_type = self.item_type().to_string();
        if item_type != KnownItemType::Item.as_str() && !filters.iter().any(|f| f.key() == Some("typeId")) {
            filters.push(self.item_type_filter());
        }

        let opts = SelectMultipleOpts { item_type, item_ids: None, filters, pagination };
        let res = self.inner.db.select_multiple(opts).await?;
        self.set_items(res.results.iter().cloned());
        Ok(res)
    }

    // Writing

    /// Save an item through its handler
    ///
    /// Existing items are loaded first; when the stored item has another type
    /// nothing is written and the handler is evicted.
    pub async fn save_item(&self, id: Uuid, data: Option<&Map<String, Value>>, is_new: bool) -> Result<SaveOutcome> {
        let handler = self.get_handler(id, false);

        if !is_new {
            // Checked against storage even when the validator keeps it out of the cache
            let stored = match self.get_item(id) {
                Some(item) => Some(item),
                None => handler.load().await?,
            };
            if let Some(loaded) = stored {
                if !loaded.type_id.is_empty() && loaded.type_id != self.item_type() {
                    log::warn!(
                        "Cannot save item {} ({}) due to wrong type ({})",
                        id,
                        self.item_type(),
                        loaded.type_id
                    );
                    self.evict_handler(id);
                    return Ok(SaveOutcome::TypeMismatch {
                        expected: self.item_type().to_string(),
                        actual: loaded.type_id,
                    });
                }
            }
        }

        if let Some(data) = data {
            handler.set_data(data)?;
        }
        if is_new && handler.created_at().is_none() {
            handler.set_created_at(current_second());
        }
        handler.touch();

        let item = handler.get_data();
        self.set_item(item.clone());
        handler.update().await?;
        log::debug!("Saved {} {}", item.type_id, item.id);

        Ok(SaveOutcome::Saved(item))
    }

    /// Remove an item from storage and from the caches
    pub async fn remove_item(&self, id: Uuid) -> Result<()> {
        let handler = self.get_handler(id, false);
        log::info!("removeItem: {} {}", handler.type_id(), id);
        handler.destroy().await?;
        self.evict(id);
        Ok(())
    }

    /// Copy every item of this type into another database; returns the count
    pub async fn copy_to_database(&self, target: &dyn ItemDatabase) -> Result<usize> {
        let opts = SelectMultipleOpts::new(self.item_type()).with_filters(vec![self.item_type_filter()]);
        let res = self.inner.db.select_multiple(opts).await?;

        let mut copied = 0;
        for item in res.results {
            log::debug!("copy: {} {}", item.type_id, item.id);
            target.insert(item.id, &item.type_id, item.to_map()).await?;
            copied += 1;
        }
        log::info!("Copied {} {} items to {} storage", copied, self.item_type(), target.source());
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalDbInterface;
    use serde_json::json;

    fn store(item_type: &str) -> GenericItemStore {
        let db: Arc<dyn ItemDatabase> = Arc::new(LocalDbInterface::in_memory("StoreTest"));
        GenericItemStore::new(db, StoreOptions::new(item_type))
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_store_name() {
        assert_eq!(StoreOptions::new("Page").store_name, "pageStore");
        assert_eq!(StoreOptions::new("AccessRole").store_name, "accessRoleStore");
    }

    #[test]
    fn test_validator_rejects_items() {
        let db: Arc<dyn ItemDatabase> = Arc::new(LocalDbInterface::in_memory("StoreTest"));
        let store = GenericItemStore::new(
            db,
            StoreOptions::new("Field").with_validator(|item| item.type_id == "Field"),
        );

        assert!(!store.set_item(Item::new("Page")));
        assert!(store.set_item(Item::new("Field")));
        assert_eq!(store.len(), 1);
        assert!(store.last_update() > 0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let pages = store("Page");
        let id = Uuid::new_v4();

        let outcome = pages.save_item(id, Some(&data(json!({ "title": "Home" }))), true).await.unwrap();
        let SaveOutcome::Saved(saved) = outcome else {
            panic!("expected a save");
        };
        assert!(saved.created_at.is_some());
        assert!(saved.updated_at.is_some());

        pages.evict(id);
        let loaded = pages.load_item(id, false).await.unwrap();
        assert_eq!(loaded.fields["title"], "Home");
        assert_eq!(loaded.type_id, "Page");
    }

    #[tokio::test]
    async fn test_save_refuses_type_mismatch() {
        let pages = store("Page");
        let hubs = GenericItemStore::new(pages.db(), StoreOptions::new("Hub"));
        let id = Uuid::new_v4();
        hubs.save_item(id, Some(&data(json!({ "name": "Docs" }))), true).await.unwrap();

        let outcome = pages.save_item(id, Some(&data(json!({ "title": "Oops" }))), false).await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::TypeMismatch { expected: "Page".to_string(), actual: "Hub".to_string() }
        );
        assert!(pages.inner.handlers.read().unwrap().get(&id).is_none());
        assert!(pages.get_item(id).is_none());

        let stored = pages.db().select(id, "Hub").await.unwrap().unwrap();
        assert_eq!(stored.fields["name"], "Docs");
        assert!(!stored.fields.contains_key("title"));
    }

    #[tokio::test]
    async fn test_load_missing_item() {
        let pages = store("Page");
        assert!(pages.load_item(Uuid::new_v4(), false).await.is_none());
        assert!(pages.inner.handlers.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_multiple_skips_cached() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.set_item(Item::with_id(id, "Page"));

        let res = pages.load_multiple(&[id], false).await;
        assert!(res.results.is_empty());
        assert_eq!(res.total_items, 0);
        assert!(!res.has_more);
    }

    #[tokio::test]
    async fn test_dirty_fields_reach_cache_on_flush() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.set_item(Item::with_id(id, "Page").with_field("title", "Home"));

        let handler = pages.get_handler(id, true);
        handler.set("title", json!("Start")).unwrap();
        handler.set("slug", json!("start")).unwrap();

        assert_eq!(pages.get_item(id).unwrap().fields["title"], "Home");
        assert_eq!(pages.flush(), 2);

        let item = pages.get_item(id).unwrap();
        assert_eq!(item.fields["title"], "Start");
        assert_eq!(item.fields["slug"], "start");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dirty_fields_flush_after_debounce() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.set_item(Item::with_id(id, "Page"));

        pages.get_handler(id, true).set("title", json!("Draft")).unwrap();
        assert_eq!(pages.pending_writes(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(pages.pending_writes(), 0);
        assert_eq!(pages.get_item(id).unwrap().fields["title"], "Draft");
    }

    #[test]
    fn test_set_item_property_changes_existing_only() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.set_item(Item::with_id(id, "Page").with_field("title", "Home"));

        assert!(pages.set_item_property(id, "title", json!("Start")));
        assert!(!pages.set_item_property(id, "slug", json!("start")));
        assert!(pages.set_item_property(id, "createdAt", json!(1_700_000_000)));
        assert!(!pages.set_item_property(Uuid::new_v4(), "title", json!("Nope")));

        let item = pages.get_item(id).unwrap();
        assert_eq!(item.fields["title"], "Start");
        assert!(!item.fields.contains_key("slug"));
        assert_eq!(item.created_at, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_custom_handler_is_not_cached() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.set_item(Item::with_id(id, "Page").with_field("title", "Home"));

        let custom = pages.get_custom_handler(id, false);
        assert_eq!(custom.get("title"), Some(json!("Home")));
        assert!(pages.inner.handlers.read().unwrap().is_empty());

        let shared = pages.get_handler(id, false);
        assert!(Arc::ptr_eq(&shared, &pages.get_handler(id, false)));
    }

    #[tokio::test]
    async fn test_search_and_load_all() {
        let pages = store("Page");
        for i in 0..7 {
            pages
                .save_item(Uuid::new_v4(), Some(&data(json!({ "title": format!("P{}", i) }))), true)
                .await
                .unwrap();
        }
        let hubs = GenericItemStore::new(pages.db(), StoreOptions::new("Hub"));
        hubs.save_item(Uuid::new_v4(), None, true).await.unwrap();

        let fresh = GenericItemStore::with_config(
            pages.db(),
            StoreOptions::new("Page"),
            StoreConfig { local_page_size: 3, ..Default::default() },
        );
        let mut pages_seen = 0;
        let mut ph = PaginationHandler::with_page_size(3);
        fresh.for_each_page(&mut ph, vec![], |_| pages_seen += 1).await;
        assert_eq!(pages_seen, 3);

        assert_eq!(fresh.load_all_items().await, 7);
        assert!(fresh.all_items().iter().all(|i| i.type_id == "Page"));
    }

    #[tokio::test]
    async fn test_remove_evicts() {
        let pages = store("Page");
        let id = Uuid::new_v4();
        pages.save_item(id, None, true).await.unwrap();
        pages.get_handler(id, true);

        pages.remove_item(id).await.unwrap();
        assert!(pages.get_item(id).is_none());
        assert!(pages.inner.handlers.read().unwrap().is_empty());
        assert!(pages.load_item(id, true).await.is_none());
    }

    #[tokio::test]
    async fn test_copy_to_database() {
        let pages = store("Page");
        pages.save_item(Uuid::new_v4(), None, true).await.unwrap();
        pages.save_item(Uuid::new_v4(), None, true).await.unwrap();

        let target = LocalDbInterface::in_memory("Copy");
        assert_eq!(pages.copy_to_database(&target).await.unwrap(), 2);
        let res = target.select_multiple(SelectMultipleOpts::new("Page")).await.unwrap();
        assert_eq!(res.total_items, 2);
    }
}
