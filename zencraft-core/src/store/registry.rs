//! Store registry
//!
//! Hands out one [`GenericItemStore`] per item type over a shared database
//! and resolves item schemas through the archetype and field stores.

use super::{GenericItemStore, StoreOptions};
use crate::config::StoreConfig;
use crate::item::KnownItemType;
use crate::schema::{ArchetypeData, FieldData};
use crate::storage::ItemDatabase;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Item types whose items define schemas
const SCHEMA_TYPES: [KnownItemType; 2] = [KnownItemType::Archetype, KnownItemType::Blueprint];

pub struct StoreRegistry {
    db: Arc<dyn ItemDatabase>,
    config: StoreConfig,
    stores: RwLock<HashMap<String, GenericItemStore>>,
}

impl StoreRegistry {
    pub fn new(db: Arc<dyn ItemDatabase>, config: StoreConfig) -> Self {
        Self { db, config, stores: RwLock::new(HashMap::new()) }
    }

    pub fn db(&self) -> Arc<dyn ItemDatabase> {
        self.db.clone()
    }

    fn options_for(item_type: &str) -> StoreOptions {
        match item_type.parse::<KnownItemType>() {
            Ok(KnownItemType::Field) => {
                StoreOptions::new(KnownItemType::Field.as_str()).with_validator(|item| item.type_id == "Field")
            }
            Ok(KnownItemType::Item) | Ok(KnownItemType::CustomItem) | Err(_) => StoreOptions::new(item_type)
                .with_store_name(format!("customItemStore:{}", item_type))
                .with_validator(|item| !item.type_id.is_empty()),
            Ok(known) => StoreOptions::new(known.as_str()),
        }
    }

    /// The store serving `item_type`, created on first use
    ///
    /// Known types get their own store. `Item`, `CustomItem` and any other
    /// type get a custom item store that only requires a `typeId`.
    pub fn store_for(&self, item_type: &str) -> GenericItemStore {
        if let Some(store) = self.stores.read().unwrap_or_else(PoisonError::into_inner).get(item_type) {
            return store.clone();
        }

        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores
            .entry(item_type.to_string())
            .or_insert_with(|| {
                log::debug!("Creating store for {}", item_type);
                GenericItemStore::with_config(self.db.clone(), Self::options_for(item_type), self.config.clone())
            })
            .clone()
    }

    /// Every store created so far
    pub fn stores(&self) -> Vec<GenericItemStore> {
        self.stores.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    fn cached_archetypes(&self) -> Vec<ArchetypeData> {
        let mut archetypes: Vec<(Option<i64>, ArchetypeData)> = SCHEMA_TYPES
            .iter()
            .flat_map(|t| self.store_for(t.as_str()).all_items())
            .filter_map(|item| ArchetypeData::try_from(&item).ok().map(|a| (item.created_at, a)))
            .collect();
        // Oldest definition wins when several target the same type
        archetypes.sort_by_key(|(created_at, a)| (created_at.unwrap_or(i64::MAX), a.id));
        archetypes.into_iter().map(|(_, a)| a).collect()
    }

    fn resolve_fields(&self, field_ids: &[Uuid]) -> Vec<FieldData> {
        let fields = self.store_for(KnownItemType::Field.as_str());
        field_ids
            .iter()
            .filter_map(|id| fields.get_item(*id))
            .filter_map(|item| match FieldData::try_from(&item) {
                Ok(field) => Some(field),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .collect()
    }

    /// Field ids attached to the archetype defining `item_type`
    pub fn field_ids_for_item_type(&self, item_type: &str) -> Vec<Uuid> {
        self.cached_archetypes()
            .into_iter()
            .find(|a| a.item_type == item_type)
            .map(|a| a.attached_fields)
            .unwrap_or_default()
    }

    /// Cached fields of an item type; fields not loaded yet are skipped
    pub fn fields_for_item_type(&self, item_type: &str) -> Vec<FieldData> {
        self.resolve_fields(&self.field_ids_for_item_type(item_type))
    }

    pub fn fields_for_archetype(&self, archetype_id: Uuid) -> Vec<FieldData> {
        let ids = self
            .cached_archetypes()
            .into_iter()
            .find(|a| a.id == archetype_id)
            .map(|a| a.attached_fields)
            .unwrap_or_default();
        self.resolve_fields(&ids)
    }

    /// Load archetypes and the fields they attach, then resolve `item_type`
    pub async fn load_fields_for_item_type(&self, item_type: &str) -> Vec<FieldData> {
        for schema_type in SCHEMA_TYPES {
            self.store_for(schema_type.as_str()).load_all_items().await;
        }
        let ids = self.field_ids_for_item_type(item_type);
        if !ids.is_empty() {
            self.store_for(KnownItemType::Field.as_str()).load_multiple(&ids, false).await;
        }
        self.resolve_fields(&ids)
    }
}

/// Cached items for `ids`, with `{id}` stubs for the ones not cached
pub fn map_item_ids_to_items(store: &GenericItemStore, ids: &[Uuid]) -> BTreeMap<Uuid, Value> {
    ids.iter()
        .map(|id| {
            let value = match store.get_item(*id) {
                Some(item) => Value::Object(item.to_map()),
                None => json!({ "id": id.to_string() }),
            };
            (*id, value)
        })
        .collect()
}
