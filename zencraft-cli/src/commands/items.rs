//! Item commands: list, get, search, remove, validate

use super::{parse_filter, parse_id, print_json};
use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use zencraft_core::config::{StoreConfig, ZencraftConfig};
use zencraft_core::storage::open_database;
use zencraft_core::validation::validate_item;
use zencraft_core::{DbPagination, ItemDatabase, PaginatedItemResponse, StoreRegistry};

async fn registry(config: &ZencraftConfig) -> Result<StoreRegistry> {
    let db = open_database(config).await?;
    Ok(StoreRegistry::new(db, config.store.clone()))
}

fn summary(res: &PaginatedItemResponse) -> Value {
    json!({
        "results": res.results.iter().map(|item| item.to_record()).collect::<Vec<_>>(),
        "totalItems": res.total_items,
        "hasMore": res.has_more,
        "page": res.pagination.page,
    })
}

pub async fn search_page(
    registry: &StoreRegistry,
    item_type: &str,
    filters: &[String],
    pagination: DbPagination,
) -> Result<PaginatedItemResponse> {
    let filters = filters.iter().map(|f| parse_filter(f)).collect::<Result<Vec<_>>>()?;
    let store = registry.store_for(item_type);
    Ok(store.try_search_items(filters, Some(pagination)).await?)
}

pub async fn list(config: &ZencraftConfig, item_type: &str, page: u32, page_size: u32) -> Result<()> {
    let registry = registry(config).await?;
    let res = search_page(&registry, item_type, &[], DbPagination::page(page, page_size)).await?;
    print_json(&summary(&res))
}

pub async fn search(config: &ZencraftConfig, item_type: &str, filters: &[String], page_size: u32) -> Result<()> {
    let registry = registry(config).await?;
    let res = search_page(&registry, item_type, filters, DbPagination::page(1, page_size)).await?;
    print_json(&summary(&res))
}

pub async fn get(config: &ZencraftConfig, item_type: &str, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let db = open_database(config).await?;
    let item = db
        .select(id, item_type)
        .await?
        .ok_or_else(|| anyhow!("{} {} not found", item_type, id))?;
    print_json(&item.to_record())
}

pub async fn remove(config: &ZencraftConfig, item_type: &str, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let registry = registry(config).await?;
    registry.store_for(item_type).remove_item(id).await?;
    println!("Removed {} {}", item_type, id);
    Ok(())
}

/// Errors per field key of one stored item
pub async fn validation_errors(
    db: Arc<dyn ItemDatabase>,
    store_config: StoreConfig,
    item_type: &str,
    id: &str,
) -> Result<BTreeMap<String, Vec<String>>> {
    let id = parse_id(id)?;
    let registry = StoreRegistry::new(db, store_config);

    let store = registry.store_for(item_type);
    let item = store
        .try_load_item(id, true)
        .await?
        .ok_or_else(|| anyhow!("{} {} not found", item_type, id))?;

    let fields = registry.load_fields_for_item_type(item_type).await;
    if fields.is_empty() {
        log::warn!("No fields attached to {}", item_type);
    }
    Ok(validate_item(&fields, &item))
}

pub async fn validate(config: &ZencraftConfig, item_type: &str, id: &str) -> Result<()> {
    let db = open_database(config).await?;
    let errors = validation_errors(db, config.store.clone(), item_type, id).await?;
    if errors.is_empty() {
        println!("{} {} is valid", item_type, id);
        return Ok(());
    }
    print_json(&errors)?;
    bail!("{} invalid field(s)", errors.len())
}
