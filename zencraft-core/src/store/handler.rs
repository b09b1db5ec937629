//! Item handlers
//!
//! An [`ItemHandler`] owns a working copy of one item and talks to storage
//! for it. Field writes made through the handler can be reported to a
//! dirty-field hook, which is how stores keep their cache in step with edits.

use crate::item::{current_second, Item};
use crate::storage::ItemDatabase;
use crate::Result;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Called with `(item_id, item_type, field, value)` after a field changes
pub type DirtyFieldHook = Arc<dyn Fn(Uuid, &str, &str, &Value) + Send + Sync>;

pub struct ItemHandler {
    id: Uuid,
    db: Arc<dyn ItemDatabase>,
    data: RwLock<Item>,
    on_dirty_field: RwLock<Option<DirtyFieldHook>>,
}

impl std::fmt::Debug for ItemHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemHandler")
            .field("id", &self.id)
            .field("data", &self.get_data())
            .field("synced", &self.has_dirty_hook())
            .finish()
    }
}

impl ItemHandler {
    pub fn new(id: Uuid, item_type: &str, db: Arc<dyn ItemDatabase>) -> Self {
        Self {
            id,
            db,
            data: RwLock::new(Item::with_id(id, item_type)),
            on_dirty_field: RwLock::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn type_id(&self) -> String {
        self.read().type_id.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Item> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Item> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the working copy
    pub fn get_data(&self) -> Item {
        self.read().clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key)
    }

    /// Write one field; the dirty hook fires when the value changed
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let (changed, type_id) = {
            let mut data = self.write();
            let changed = data.get(key).as_ref() != Some(&value);
            data.set(key, value.clone())?;
            (changed, data.type_id.clone())
        };

        if changed {
            let hook = self.on_dirty_field.read().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(hook) = hook {
                hook(self.id, &type_id, key, &value);
            }
        }
        Ok(())
    }

    /// Write several fields, firing the dirty hook per changed field
    pub fn set_data(&self, data: &Map<String, Value>) -> Result<()> {
        for (key, value) in data {
            if key == "id" || key == "itemId" {
                continue;
            }
            self.set(key, value.clone())?;
        }
        Ok(())
    }

    /// Replace the working copy without notifying anyone
    pub fn replace_data(&self, mut item: Item) {
        item.id = self.id;
        *self.write() = item;
    }

    pub fn set_on_dirty_field(&self, hook: Option<DirtyFieldHook>) {
        *self.on_dirty_field.write().unwrap_or_else(PoisonError::into_inner) = hook;
    }

    pub fn has_dirty_hook(&self) -> bool {
        self.on_dirty_field.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn created_at(&self) -> Option<i64> {
        self.read().created_at
    }

    pub fn set_created_at(&self, ts: i64) {
        self.write().created_at = Some(ts);
    }

    pub fn touch(&self) {
        self.write().updated_at = Some(current_second());
    }

    /// Fetch the item from storage into the working copy
    ///
    /// Returns `None` and leaves the working copy alone when the item is absent.
    pub async fn load(&self) -> Result<Option<Item>> {
        let type_id = self.type_id();
        let loaded = self.db.select(self.id, &type_id).await?;
        if let Some(item) = &loaded {
            self.replace_data(item.clone());
        }
        Ok(loaded)
    }

    /// Persist the working copy
    pub async fn update(&self) -> Result<()> {
        let item = self.get_data();
        self.db.update(self.id, &item.type_id, item.to_map(), false).await
    }

    /// Remove the item from storage
    pub async fn destroy(&self) -> Result<()> {
        let type_id = self.type_id();
        self.db.remove(self.id, &type_id).await
    }
}
