//! Typed views over schema items
//!
//! Fields, archetypes and blocks are stored as plain [`Item`]s. The structs in
//! this module read the parts of an item the rest of the crate relies on.

use crate::item::{is_uuid, Item};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Input kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Boolean,
    Select,
    MultiSelect,
    Timestamp,
    Readonly,
    /// Reference to one item
    ItemSelect,
    /// References to several items
    ItemSelectMultiple,
    ItemFilters,
    Object,
    Json,
    #[serde(other)]
    Other,
}

/// Declarative validation attached to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationOpts {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Extra rule names, e.g. `["isUuid"]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

/// A schema slot definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    pub id: Uuid,
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub field_type: FieldType,
    /// Either plain values or `{label, value}` objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidationOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldData {
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            id: Uuid::new_v4(),
            label: key.clone(),
            key,
            field_type,
            options: None,
            validation: None,
            is_searchable: None,
            default_value: None,
        }
    }

    /// The values a select-like field accepts
    pub fn option_values(&self) -> Vec<Value> {
        self.options
            .iter()
            .flatten()
            .map(|opt| match opt {
                Value::Object(obj) => obj.get("value").cloned().unwrap_or(Value::Null),
                other => other.clone(),
            })
            .collect()
    }

    pub fn is_required(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.required)
    }
}

/// Schema-defining meta item: attaches fields to an item type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeData {
    pub id: Uuid,
    #[serde(default)]
    pub item_type: String,
    #[serde(default, deserialize_with = "lenient_uuid_list")]
    pub attached_fields: Vec<Uuid>,
}

/// Position of a child block inside its parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildBlockRef {
    pub id: Uuid,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
}

/// A placed UI node. Children are referenced by id and stored independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_id: Option<Uuid>,
    #[serde(default)]
    pub child_blocks: Vec<ChildBlockRef>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl BlockData {
    pub fn child_ids(&self) -> Vec<Uuid> {
        self.child_blocks.iter().map(|c| c.id).collect()
    }
}

// Archetypes written by hand sometimes carry empty or placeholder entries
fn lenient_uuid_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Uuid>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| is_uuid(s))
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect())
}

fn view<T: serde::de::DeserializeOwned>(item: &Item, kind: &str) -> Result<T> {
    serde_json::from_value(Value::Object(item.to_map()))
        .map_err(|e| Error::InvalidInput(format!("item {} is not a valid {}: {}", item.id, kind, e)))
}

impl TryFrom<&Item> for FieldData {
    type Error = Error;

    fn try_from(item: &Item) -> Result<Self> {
        view(item, "field")
    }
}

impl TryFrom<&Item> for ArchetypeData {
    type Error = Error;

    fn try_from(item: &Item) -> Result<Self> {
        view(item, "archetype")
    }
}

impl TryFrom<&Item> for BlockData {
    type Error = Error;

    fn try_from(item: &Item) -> Result<Self> {
        view(item, "block")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        Item::from_record(value).unwrap()
    }

    #[test]
    fn test_field_from_item() {
        let field = FieldData::try_from(&item(json!({
            "id": "0a6f3c1e-1111-4c1d-8e7f-001122334455",
            "typeId": "Field",
            "key": "status",
            "label": "Status",
            "fieldType": "select",
            "options": ["draft", { "label": "Live", "value": "live" }],
            "validation": { "required": true }
        })))
        .unwrap();

        assert_eq!(field.field_type, FieldType::Select);
        assert!(field.is_required());
        assert_eq!(field.option_values(), vec![json!("draft"), json!("live")]);
    }

    #[test]
    fn test_unknown_field_type_is_other() {
        let field = FieldData::try_from(&item(json!({
            "id": "0a6f3c1e-1111-4c1d-8e7f-001122334455",
            "key": "colour",
            "fieldType": "colorPicker"
        })))
        .unwrap();
        assert_eq!(field.field_type, FieldType::Other);
    }

    #[test]
    fn test_archetype_skips_invalid_field_ids() {
        let archetype = ArchetypeData::try_from(&item(json!({
            "id": "0a6f3c1e-2222-4c1d-8e7f-001122334455",
            "typeId": "Archetype",
            "itemType": "Page",
            "attachedFields": ["", "0a6f3c1e-3333-4c1d-8e7f-001122334455", "todo"]
        })))
        .unwrap();

        assert_eq!(archetype.item_type, "Page");
        assert_eq!(archetype.attached_fields.len(), 1);
    }

    #[test]
    fn test_block_children() {
        let block = BlockData::try_from(&item(json!({
            "id": "0a6f3c1e-4444-4c1d-8e7f-001122334455",
            "typeId": "Block",
            "childBlocks": [
                { "id": "0a6f3c1e-5555-4c1d-8e7f-001122334455", "row": 1, "col": 2 }
            ],
            "config": { "title": "Hero" }
        })))
        .unwrap();

        assert_eq!(block.child_blocks[0].col, 2);
        assert_eq!(block.child_ids().len(), 1);
        assert_eq!(block.config["title"], "Hero");
    }
}
