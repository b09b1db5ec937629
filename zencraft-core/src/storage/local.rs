//! Local item database
//!
//! Each table is a single JSON array stored under `db_<dbName>_<tableName>`
//! in a [`KeyValueBackend`]. Queries are linear scans. Rows are flat records
//! carrying both `id` and `itemId`; rows written by older builds that keep
//! their fields in `jsonData` are flattened when read.

use super::{require_item_type, AppDataSource, ItemDatabase, KeyValueBackend, MemoryBackend, SelectMultipleOpts};
use crate::filter::{DbFilter, DbFilterHandler, FilterOperator};
use crate::item::{current_second, id_or_item_id, merge_item_data, Item};
use crate::pagination::{sort_records, PaginatedItemResponse, PaginationHandler};
use crate::storage::backend::FileBackend;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_DB_NAME: &str = "ItemDatabase";
pub const ITEMS_TABLE: &str = "itemsPublished";

/// Backend key of a table
pub fn table_key(db_name: &str, table: &str) -> String {
    format!("db_{}_{}", db_name, table)
}

/// One JSON-array table
///
/// Read-modify-write cycles are serialized per table inside this process.
/// Separate processes sharing a backend still race, last write wins.
pub struct LocalTable {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
    write_lock: Mutex<()>,
}

impl LocalTable {
    pub fn new(backend: Arc<dyn KeyValueBackend>, db_name: &str, table: &str) -> Self {
        Self { backend, key: table_key(db_name, table), write_lock: Mutex::new(()) }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current rows, as stored
    pub async fn rows(&self) -> Result<Vec<Value>> {
        let Some(raw) = self.backend.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Array(rows) => Ok(rows),
            _ => Err(Error::Storage(format!("table {} is not a JSON array", self.key))),
        }
    }

    /// Run `f` over the rows and persist the result atomically for this process
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Value>) -> R + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.rows().await?;
        let result = f(&mut rows);
        self.backend.set(&self.key, serde_json::to_string(&rows)?).await?;
        Ok(result)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Value>> {
        Ok(self.rows().await?.into_iter().find(|row| id_or_item_id(row) == Some(id)))
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.rows().await?.len())
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.remove(&self.key).await
    }
}

/// Flatten a stored row into a regular record, `None` when it is unusable
fn normalize_row(row: &Value) -> Option<Value> {
    match Item::from_record(row.clone()) {
        Ok(item) => Some(item.to_record()),
        Err(e) => {
            log::warn!("Skipping unreadable row: {}", e);
            None
        }
    }
}

fn position_of(rows: &[Value], id: Uuid) -> Option<usize> {
    rows.iter().position(|row| id_or_item_id(row) == Some(id))
}

/// [`ItemDatabase`] over local JSON-array tables
pub struct LocalDbInterface {
    db_name: String,
    backend: Arc<dyn KeyValueBackend>,
    items: LocalTable,
    write_delay: Duration,
}

impl LocalDbInterface {
    pub fn new(db_name: &str, backend: Arc<dyn KeyValueBackend>) -> Self {
        let items = LocalTable::new(backend.clone(), db_name, ITEMS_TABLE);
        Self { db_name: db_name.to_string(), backend, items, write_delay: Duration::ZERO }
    }

    pub fn in_memory(db_name: &str) -> Self {
        Self::new(db_name, Arc::new(MemoryBackend::new()))
    }

    /// Tables as files under `dir`
    pub fn open_dir(db_name: &str, dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(db_name, Arc::new(FileBackend::new(dir.as_ref())?)))
    }

    /// Artificial latency before each write
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn backend(&self) -> Arc<dyn KeyValueBackend> {
        self.backend.clone()
    }

    pub fn items_table(&self) -> &LocalTable {
        &self.items
    }

    async fn delay(&self) {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
    }
}

#[async_trait::async_trait]
impl ItemDatabase for LocalDbInterface {
    fn source(&self) -> AppDataSource {
        AppDataSource::Local
    }

    async fn insert(&self, item_id: Uuid, item_type: &str, data: Map<String, Value>) -> Result<()> {
        self.delay().await;

        let now = current_second();
        let mut record = data;
        record.insert("id".to_string(), Value::String(item_id.to_string()));
        record.insert("itemId".to_string(), Value::String(item_id.to_string()));
        record.entry("typeId").or_insert_with(|| Value::String(item_type.to_string()));
        record.entry("createdAt").or_insert_with(|| Value::from(now));
        record.entry("updatedAt").or_insert_with(|| Value::from(now));

        let inserted = self
            .items
            .modify(move |rows| {
                if position_of(rows, item_id).is_some() {
                    return false;
                }
                rows.push(Value::Object(record));
                true
            })
            .await?;

        if inserted {
            log::debug!("Inserted {} {}", item_type, item_id);
        } else {
            log::debug!("Insert skipped, {} {} already exists", item_type, item_id);
        }
        Ok(())
    }

    async fn update(
        &self,
        item_id: Uuid,
        item_type: &str,
        data: Map<String, Value>,
        set_updated: bool,
    ) -> Result<()> {
        require_item_type(item_type)?;
        if data.is_empty() {
            return Ok(());
        }
        self.delay().await;

        let now = current_second();
        let item_type = item_type.to_string();
        self.items
            .modify(move |rows| match position_of(rows, item_id) {
                Some(index) => {
                    let existing = match normalize_row(&rows[index]) {
                        Some(Value::Object(row)) => row,
                        _ => {
                            // Merge over the raw row so its stored fields survive
                            log::warn!("Row {} is unreadable, merging over it as stored", item_id);
                            rows[index].as_object().cloned().unwrap_or_default()
                        }
                    };
                    let mut merged = merge_item_data(&existing, &data);
                    merged.insert("id".to_string(), Value::String(item_id.to_string()));
                    merged.insert("itemId".to_string(), Value::String(item_id.to_string()));
                    if set_updated {
                        merged.insert("updatedAt".to_string(), Value::from(now));
                    }
                    rows[index] = Value::Object(merged);
                }
                None => {
                    let mut record = data;
                    record.insert("id".to_string(), Value::String(item_id.to_string()));
                    record.insert("itemId".to_string(), Value::String(item_id.to_string()));
                    record.entry("typeId").or_insert_with(|| Value::String(item_type.clone()));
                    record.insert("createdBy".to_string(), Value::String("unknown".to_string()));
                    record.insert("createdAt".to_string(), Value::from(now));
                    record.insert("updatedAt".to_string(), Value::from(now));
                    rows.push(Value::Object(record));
                }
            })
            .await
    }

    async fn select(&self, item_id: Uuid, _item_type: &str) -> Result<Option<Item>> {
        // Lookup is by id only; a stored item of another type is still returned
        self.items.find(item_id).await?.map(Item::from_record).transpose()
    }

    async fn select_multiple(&self, opts: SelectMultipleOpts) -> Result<PaginatedItemResponse> {
        let SelectMultipleOpts { item_type, item_ids, filters, pagination } = opts;

        let mut handler = DbFilterHandler::new(filters);
        handler.update_filter(DbFilter::single("typeId", FilterOperator::IsEqual, item_type.as_str()));
        if let Some(ids) = &item_ids {
            let ids: Vec<Value> = ids.iter().map(|id| Value::String(id.to_string())).collect();
            handler.update_filter(DbFilter::single("itemId", FilterOperator::In, ids));
        }

        let mut matched: Vec<Value> = self
            .items
            .rows()
            .await?
            .iter()
            .filter_map(normalize_row)
            .filter(|row| handler.matches(row))
            .collect();

        let has_pagination = pagination.is_some();
        let mut ph = PaginationHandler::new(pagination);
        ph.set_total(matched.len() as u64);

        if let Some(sort_by) = ph.pagination.sort_by.clone() {
            sort_records(&mut matched, &sort_by, ph.pagination.sort_order.unwrap_or_default());
        }

        let (page_rows, has_more) = if has_pagination {
            (ph.slice(&matched), ph.has_more())
        } else {
            (matched, false)
        };

        let results = page_rows.into_iter().map(Item::from_record).collect::<Result<Vec<_>>>()?;

        Ok(PaginatedItemResponse {
            total_items: ph.pagination.total_rows.unwrap_or_default(),
            results,
            has_more,
            pagination: ph.pagination,
        })
    }

    async fn remove(&self, item_id: Uuid, item_type: &str) -> Result<()> {
        require_item_type(item_type)?;
        self.delay().await;

        let removed = self
            .items
            .modify(move |rows| {
                let before = rows.len();
                rows.retain(|row| id_or_item_id(row) != Some(item_id));
                before != rows.len()
            })
            .await?;

        if removed {
            log::debug!("Removed {} {}", item_type, item_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::DbPagination;
    use serde_json::json;
    use tempfile::TempDir;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn seed_pages(db: &LocalDbInterface, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..count {
            let id = Uuid::new_v4();
            db.insert(id, "Page", data(json!({ "typeId": "Page", "title": format!("Page {}", i), "order": i })))
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }

    #[tokio::test]
    async fn test_insert_then_select() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let id = Uuid::new_v4();

        db.insert(id, "Page", data(json!({ "title": "Home" }))).await.unwrap();

        let item = db.select(id, "Page").await.unwrap().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.type_id, "Page");
        assert_eq!(item.fields.get("title"), Some(&json!("Home")));
        assert!(item.created_at.is_some());
        assert!(item.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_insert_does_not_overwrite() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let id = Uuid::new_v4();

        db.insert(id, "Page", data(json!({ "title": "First" }))).await.unwrap();
        db.insert(id, "Page", data(json!({ "title": "Second" }))).await.unwrap();

        let item = db.select(id, "Page").await.unwrap().unwrap();
        assert_eq!(item.fields["title"], "First");
        assert_eq!(db.items_table().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_existing() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let id = Uuid::new_v4();
        db.insert(id, "Page", data(json!({ "title": "Home", "slug": "home", "draft": true })))
            .await
            .unwrap();

        db.update(id, "Page", data(json!({ "title": "Start", "draft": null })), false).await.unwrap();

        let item = db.select(id, "Page").await.unwrap().unwrap();
        assert_eq!(item.fields["title"], "Start");
        assert_eq!(item.fields["slug"], "home");
        assert_eq!(item.fields["draft"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_inserts_when_absent() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let id = Uuid::new_v4();

        db.update(id, "Hub", data(json!({ "name": "Docs" })), false).await.unwrap();

        let item = db.select(id, "Hub").await.unwrap().unwrap();
        assert_eq!(item.type_id, "Hub");
        assert_eq!(item.created_by.as_deref(), Some("unknown"));
        assert!(item.created_at.is_some());
    }

    #[tokio::test]
    async fn test_update_rejects_empty_type() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let err = db.update(Uuid::new_v4(), "", data(json!({ "a": 1 })), false).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_select_multiple_forces_type_filter() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        seed_pages(&db, 3).await;
        db.insert(Uuid::new_v4(), "Hub", data(json!({ "typeId": "Hub" }))).await.unwrap();

        let res = db.select_multiple(SelectMultipleOpts::new("Page")).await.unwrap();
        assert_eq!(res.total_items, 3);
        assert_eq!(res.results.len(), 3);
        assert!(!res.has_more);
        assert!(res.results.iter().all(|i| i.type_id == "Page"));
    }

    #[tokio::test]
    async fn test_select_multiple_by_ids_and_filters() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let ids = seed_pages(&db, 4).await;

        let res = db
            .select_multiple(SelectMultipleOpts::new("Page").with_ids(vec![ids[0], ids[2]]))
            .await
            .unwrap();
        assert_eq!(res.total_items, 2);

        let res = db
            .select_multiple(
                SelectMultipleOpts::new("Page")
                    .with_filters(vec![DbFilter::single("title", FilterOperator::FuzzyEqual, "page 3")]),
            )
            .await
            .unwrap();
        assert_eq!(res.results.len(), 1);
        assert_eq!(res.results[0].id, ids[3]);
    }

    #[tokio::test]
    async fn test_select_multiple_pages() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        seed_pages(&db, 25).await;

        let mut pagination = DbPagination::page(1, 10);
        pagination.sort_by = Some("order".to_string());
        let first = db
            .select_multiple(SelectMultipleOpts::new("Page").with_pagination(pagination.clone()))
            .await
            .unwrap();
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.total_items, 25);
        assert!(first.has_more);
        assert_eq!(first.results[0].fields["order"], 0);

        pagination.page = 3;
        let last = db
            .select_multiple(SelectMultipleOpts::new("Page").with_pagination(pagination))
            .await
            .unwrap();
        assert_eq!(last.results.len(), 5);
        assert!(!last.has_more);
        assert_eq!(last.pagination.total_rows, Some(25));
    }

    #[tokio::test]
    async fn test_legacy_json_data_rows() {
        let backend = Arc::new(MemoryBackend::new());
        let id = Uuid::new_v4();
        let legacy = json!([{
            "itemId": id.to_string(),
            "typeId": "Field",
            "jsonData": "{\"key\":\"title\",\"label\":\"Title\"}",
            "createdBy": "admin",
            "createdAt": 1,
            "updatedAt": 2
        }]);
        backend
            .set(&table_key(DEFAULT_DB_NAME, ITEMS_TABLE), legacy.to_string())
            .await
            .unwrap();

        let db = LocalDbInterface::new(DEFAULT_DB_NAME, backend);
        let res = db.select_multiple(SelectMultipleOpts::new("Field")).await.unwrap();
        assert_eq!(res.results.len(), 1);
        assert_eq!(res.results[0].fields["key"], "title");

        db.update(id, "Field", data(json!({ "label": "Heading" })), true).await.unwrap();
        let item = db.select(id, "Field").await.unwrap().unwrap();
        assert_eq!(item.fields["key"], "title");
        assert_eq!(item.fields["label"], "Heading");
        assert!(item.updated_at.unwrap_or_default() > 2);
    }

    #[tokio::test]
    async fn test_update_keeps_fields_of_unreadable_row() {
        let backend = Arc::new(MemoryBackend::new());
        let id = Uuid::new_v4();
        let broken = json!([{
            "itemId": id.to_string(),
            "typeId": "Page",
            "title": "Home",
            "jsonData": "{not json"
        }]);
        backend
            .set(&table_key(DEFAULT_DB_NAME, ITEMS_TABLE), broken.to_string())
            .await
            .unwrap();

        let db = LocalDbInterface::new(DEFAULT_DB_NAME, backend);
        db.update(id, "Page", data(json!({ "slug": "home" })), true).await.unwrap();

        let rows = db.items_table().rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Home");
        assert_eq!(rows[0]["typeId"], "Page");
        assert_eq!(rows[0]["slug"], "home");
        assert_eq!(rows[0]["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_remove() {
        let db = LocalDbInterface::in_memory(DEFAULT_DB_NAME);
        let ids = seed_pages(&db, 2).await;

        assert!(db.remove(ids[0], "").await.is_err());

        db.remove(ids[0], "Page").await.unwrap();
        assert!(db.select(ids[0], "Page").await.unwrap().is_none());
        assert!(db.select(ids[1], "Page").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_tables_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        {
            let db = LocalDbInterface::open_dir(DEFAULT_DB_NAME, temp_dir.path()).unwrap();
            db.insert(id, "Module", data(json!({ "name": "Blog" }))).await.unwrap();
        }

        let db = LocalDbInterface::open_dir(DEFAULT_DB_NAME, temp_dir.path()).unwrap();
        assert_eq!(db.items_table().key(), "db_ItemDatabase_itemsPublished");
        let item = db.select(id, "Module").await.unwrap().unwrap();
        assert_eq!(item.fields["name"], "Blog");
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_not_lost() {
        let db = Arc::new(LocalDbInterface::in_memory(DEFAULT_DB_NAME));
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let db = db.clone();
            tasks.push(tokio::spawn(async move {
                db.insert(Uuid::new_v4(), "Block", Map::new()).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(db.items_table().len().await.unwrap(), 20);
    }
}
