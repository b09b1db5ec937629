//! Item records
//!
//! An [`Item`] is the unit of storage: a UUID, a `typeId` discriminator, a few
//! metadata fields and an open map of data fields. On the wire and in storage
//! an item is a flat camelCase JSON object:
//!
//! ```json
//! { "id": "…", "typeId": "Page", "createdAt": 1700000000, "title": "Home" }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Record keys that map onto [`Item`] metadata rather than data fields
pub const META_KEYS: [&str; 5] = ["id", "typeId", "createdAt", "updatedAt", "createdBy"];

/// Item types the application ships stores for
///
/// Any other `typeId` is a custom item type and is handled by the custom item
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownItemType {
    Item,
    CustomItem,
    Field,
    Archetype,
    Blueprint,
    Block,
    BlockDefinition,
    ItemDefinition,
    Page,
    Hub,
    Module,
    AccessRole,
}

impl KnownItemType {
    pub const ALL: [KnownItemType; 12] = [
        KnownItemType::Item,
        KnownItemType::CustomItem,
        KnownItemType::Field,
        KnownItemType::Archetype,
        KnownItemType::Blueprint,
        KnownItemType::Block,
        KnownItemType::BlockDefinition,
        KnownItemType::ItemDefinition,
        KnownItemType::Page,
        KnownItemType::Hub,
        KnownItemType::Module,
        KnownItemType::AccessRole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownItemType::Item => "Item",
            KnownItemType::CustomItem => "CustomItem",
            KnownItemType::Field => "Field",
            KnownItemType::Archetype => "Archetype",
            KnownItemType::Blueprint => "Blueprint",
            KnownItemType::Block => "Block",
            KnownItemType::BlockDefinition => "BlockDefinition",
            KnownItemType::ItemDefinition => "ItemDefinition",
            KnownItemType::Page => "Page",
            KnownItemType::Hub => "Hub",
            KnownItemType::Module => "Module",
            KnownItemType::AccessRole => "AccessRole",
        }
    }
}

impl fmt::Display for KnownItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KnownItemType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown item type: {}", s)))
    }
}

/// Current Unix time in whole seconds
pub fn current_second() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Check whether a string is a hyphenated UUID
pub fn is_uuid(value: &str) -> bool {
    value.len() == 36 && Uuid::parse_str(value).is_ok()
}

/// Resolve a record's identity: the first of `id` / `itemId` that is a UUID
pub fn id_or_item_id(record: &Value) -> Option<Uuid> {
    let obj = record.as_object()?;
    ["id", "itemId"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| is_uuid(s))
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Shallow merge of two records
///
/// Keys present in `new_data` win, explicit `null` included. Keys only present
/// in `existing` are kept.
pub fn merge_item_data(existing: &Map<String, Value>, new_data: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in new_data {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn value_as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| chrono::DateTime::parse_from_rfc3339(s).ok().map(|at| at.timestamp()))
        }
        _ => None,
    }
}

/// A typed, UUID-identified record
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub type_id: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub created_by: Option<String>,
    /// Everything that is not metadata
    pub fields: Map<String, Value>,
}

impl Item {
    /// Create an empty item of the given type with a fresh id
    pub fn new(type_id: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), type_id)
    }

    pub fn with_id(id: Uuid, type_id: impl Into<String>) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            created_at: None,
            updated_at: None,
            created_by: None,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build an item from a stored or received record
    ///
    /// Accepts `itemId` in place of `id`, and flattens legacy rows that keep
    /// their data in a `jsonData` string or object.
    pub fn from_record(record: Value) -> Result<Self> {
        let Value::Object(mut map) = record else {
            return Err(Error::InvalidInput("item record must be a JSON object".to_string()));
        };

        if let Some(json_data) = map.remove("jsonData") {
            let nested = match json_data {
                Value::String(s) if !s.is_empty() => serde_json::from_str::<Value>(&s)?,
                other => other,
            };
            if let Value::Object(nested) = nested {
                for (key, value) in nested {
                    map.entry(key).or_insert(value);
                }
            }
        }

        let id = id_or_item_id(&Value::Object(map.clone()))
            .ok_or_else(|| Error::InvalidId(format!("{:?}", map.get("id").or(map.get("itemId")))))?;
        map.remove("id");
        map.remove("itemId");

        let type_id = match map.remove("typeId") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let created_at = map.remove("createdAt").as_ref().and_then(value_as_seconds);
        let updated_at = map.remove("updatedAt").as_ref().and_then(value_as_seconds);
        let created_by = match map.remove("createdBy") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        Ok(Self { id, type_id, created_at, updated_at, created_by, fields: map })
    }

    /// Flat JSON form of the item (no `itemId`)
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.fields.clone();
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        map.insert("typeId".to_string(), Value::String(self.type_id.clone()));
        if let Some(ts) = self.created_at {
            map.insert("createdAt".to_string(), Value::from(ts));
        }
        if let Some(ts) = self.updated_at {
            map.insert("updatedAt".to_string(), Value::from(ts));
        }
        if let Some(by) = &self.created_by {
            map.insert("createdBy".to_string(), Value::String(by.clone()));
        }
        map
    }

    /// Flat JSON form as stored in tables (with `itemId` mirroring `id`)
    pub fn to_record(&self) -> Value {
        let mut map = self.to_map();
        map.insert("itemId".to_string(), Value::String(self.id.to_string()));
        Value::Object(map)
    }

    /// Read a field or metadata value by record key
    /// Keys stored outside `fields`
    pub fn is_metadata_key(key: &str) -> bool {
        matches!(key, "id" | "itemId" | "typeId" | "createdAt" | "updatedAt" | "createdBy")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "id" | "itemId" => Some(Value::String(self.id.to_string())),
            "typeId" => Some(Value::String(self.type_id.clone())),
            "createdAt" => self.created_at.map(Value::from),
            "updatedAt" => self.updated_at.map(Value::from),
            "createdBy" => self.created_by.clone().map(Value::String),
            _ => self.fields.get(key).cloned(),
        }
    }

    /// Write a field or metadata value by record key
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match key {
            "id" | "itemId" => {
                let id = value
                    .as_str()
                    .filter(|s| is_uuid(s))
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| Error::InvalidId(value.to_string()))?;
                self.id = id;
            }
            "typeId" => {
                self.type_id = value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidInput("typeId must be a string".to_string()))?;
            }
            "createdAt" => self.created_at = value_as_seconds(&value),
            "updatedAt" => self.updated_at = value_as_seconds(&value),
            "createdBy" => self.created_by = value.as_str().map(str::to_string),
            _ => {
                self.fields.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Shallow-merge `data` into this item, keeping the item's id
    pub fn merge(&mut self, data: &Map<String, Value>) -> Result<()> {
        let id = self.id;
        let mut merged = merge_item_data(&self.to_map(), data);
        merged.insert("id".to_string(), Value::String(id.to_string()));
        merged.remove("itemId");
        *self = Item::from_record(Value::Object(merged))?;
        Ok(())
    }

    /// Human-readable label: title, name, label, or the first id segment
    pub fn label(&self) -> String {
        ["title", "name", "label"]
            .iter()
            .filter_map(|k| self.fields.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| short_id(&self.id))
    }
}

/// First segment of a UUID, used for compact display
pub fn short_id(id: &Uuid) -> String {
    id.to_string().split('-').next().unwrap_or_default().to_string()
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Item::from_record(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "2f0c6a3e-9a8b-4c1d-8e7f-001122334455";

    #[test]
    fn test_from_record_accepts_item_id() {
        let item = Item::from_record(json!({
            "itemId": ID,
            "typeId": "Page",
            "title": "Home",
            "createdAt": "1700000000"
        }))
        .unwrap();

        assert_eq!(item.id.to_string(), ID);
        assert_eq!(item.type_id, "Page");
        assert_eq!(item.created_at, Some(1_700_000_000));
        assert_eq!(item.fields.get("title"), Some(&json!("Home")));
        assert!(!item.fields.contains_key("itemId"));
    }

    #[test]
    fn test_from_record_reads_rfc3339_timestamps() {
        let item = Item::from_record(json!({
            "id": ID,
            "typeId": "Page",
            "createdAt": "2023-11-14T22:13:20Z",
            "updatedAt": "2023-11-14T23:13:20+01:00"
        }))
        .unwrap();

        assert_eq!(item.created_at, Some(1_700_000_000));
        assert_eq!(item.updated_at, Some(1_700_000_000));
    }

    #[test]
    fn test_from_record_flattens_legacy_json_data() {
        let item = Item::from_record(json!({
            "itemId": ID,
            "typeId": "Field",
            "jsonData": "{\"key\":\"title\",\"label\":\"Title\"}"
        }))
        .unwrap();

        assert_eq!(item.fields.get("key"), Some(&json!("title")));
        assert!(!item.fields.contains_key("jsonData"));
    }

    #[test]
    fn test_from_record_rejects_missing_id() {
        let err = Item::from_record(json!({ "id": "not-a-uuid", "typeId": "Page" })).unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[test]
    fn test_merge_keeps_absent_keys_and_applies_null() {
        let existing = json!({ "a": 1, "b": "keep", "c": true });
        let new_data = json!({ "a": 0, "c": null, "d": "new" });

        let merged = merge_item_data(
            existing.as_object().unwrap(),
            new_data.as_object().unwrap(),
        );

        assert_eq!(Value::Object(merged), json!({ "a": 0, "b": "keep", "c": null, "d": "new" }));
    }

    #[test]
    fn test_item_serde_is_flat_camel_case() {
        let mut item = Item::with_id(Uuid::parse_str(ID).unwrap(), "Hub");
        item.created_by = Some("admin".to_string());
        item.set("name", json!("Docs")).unwrap();

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["typeId"], "Hub");
        assert_eq!(value["createdBy"], "admin");
        assert_eq!(value["name"], "Docs");

        let back: Item = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_label_falls_back_to_short_id() {
        let item = Item::with_id(Uuid::parse_str(ID).unwrap(), "Block");
        assert_eq!(item.label(), "2f0c6a3e");
        assert_eq!(item.with_field("name", "Hero").label(), "Hero");
    }

    #[test]
    fn test_known_item_type_round_trip() {
        for t in KnownItemType::ALL {
            assert_eq!(t.as_str().parse::<KnownItemType>().unwrap(), t);
        }
        assert!("Widget".parse::<KnownItemType>().is_err());
    }
}
