//! Default data import
//!
//! Default items come as one JSON object keyed by item type:
//!
//! ```json
//! { "Page": [{ "id": "0a6f3c1e-...", "title": "Home" }], "Field": [] }
//! ```

use crate::item::{id_or_item_id, KnownItemType};
use crate::storage::ItemDatabase;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

pub type DefaultItems = BTreeMap<String, Vec<Value>>;

// Account data never ships as defaults
const RESERVED_TYPES: [&str; 3] = ["login", "session", "permission"];

pub fn parse_default_items(json: &str) -> Result<DefaultItems> {
    Ok(serde_json::from_str(json)?)
}

pub async fn read_default_items(path: impl AsRef<Path>) -> Result<DefaultItems> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_default_items(&content)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub inserted: Vec<Uuid>,
    /// Entries without a usable id, as their raw `id`/`itemId`
    pub failed: Vec<String>,
}

/// Insert the default entries of one item type
///
/// Entries keep their own `id` (or `itemId`); those without a UUID are
/// reported as failed. Storage errors abort the import.
pub async fn insert_default_items(db: &dyn ItemDatabase, item_type: &str, items: &[Value]) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    if RESERVED_TYPES.contains(&item_type) {
        return Ok(report);
    }

    for entry in items {
        match (id_or_item_id(entry), entry.as_object()) {
            (Some(id), Some(data)) => {
                db.insert(id, item_type, data.clone()).await?;
                report.inserted.push(id);
            }
            _ => {
                let raw = entry
                    .get("id")
                    .or_else(|| entry.get("itemId"))
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .unwrap_or_default();
                log::warn!("Skipping default {} without a valid id: '{}'", item_type, raw);
                report.failed.push(raw);
            }
        }
    }

    log::info!("Inserted {} default {} items", report.inserted.len(), item_type);
    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeedStatus {
    Processing,
    Done,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProgress {
    pub item_type: String,
    pub is_done: bool,
    pub status: SeedStatus,
    pub error: Option<String>,
    pub report: SeedReport,
}

/// Import defaults for every known item type except `Item` and `CustomItem`
///
/// `on_progress` sees each type once when it starts and once when it ends.
/// A failing type is marked `Errored` and the import moves on.
pub async fn insert_all_default_items(
    db: &dyn ItemDatabase,
    defaults: &DefaultItems,
    mut on_progress: impl FnMut(&SeedProgress),
) -> Vec<SeedProgress> {
    let item_types = KnownItemType::ALL
        .into_iter()
        .filter(|t| !matches!(t, KnownItemType::Item | KnownItemType::CustomItem));

    let mut progress = Vec::new();
    for item_type in item_types {
        let mut entry = SeedProgress {
            item_type: item_type.to_string(),
            is_done: false,
            status: SeedStatus::Processing,
            error: None,
            report: SeedReport::default(),
        };
        on_progress(&entry);

        let result = match defaults.get(item_type.as_str()) {
            Some(items) => insert_default_items(db, item_type.as_str(), items).await,
            None => {
                log::warn!("No default items found for {}", item_type);
                Ok(SeedReport::default())
            }
        };

        match result {
            Ok(report) => {
                entry.status = SeedStatus::Done;
                entry.report = report;
            }
            Err(e) => {
                log::error!("Importing default {} items failed: {}", item_type, e);
                entry.status = SeedStatus::Errored;
                entry.error = Some(format!("Error: {}", e));
            }
        }
        entry.is_done = true;
        on_progress(&entry);
        progress.push(entry);
    }
    progress
}

impl SeedProgress {
    pub fn into_result(self) -> Result<SeedReport> {
        match self.error {
            Some(error) => Err(Error::Storage(format!("{}: {}", self.item_type, error))),
            None => Ok(self.report),
        }
    }
}
