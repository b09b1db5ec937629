//! Field validation
//!
//! Rules are named, so a field can list them in its definition and a form
//! can look them up. Every rule is a pure check of one value against one
//! field and reports failure as a display string.
//!
//! Type rules let empty values through; only `required` rejects them.

use crate::filter::{loose_eq, DbFilter, FilterOperator};
use crate::item::{is_uuid, Item};
use crate::schema::{FieldData, FieldType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationRule {
    Required,
    Options,
    Between,
    IsBoolean,
    IsArray,
    IsNumber,
    IsObject,
    IsString,
    IsTimestamp,
    IsUuid,
    IsUuidArray,
    IsItemFilterArray,
}

impl ValidationRule {
    pub const ALL: [ValidationRule; 12] = [
        ValidationRule::Required,
        ValidationRule::Options,
        ValidationRule::Between,
        ValidationRule::IsBoolean,
        ValidationRule::IsArray,
        ValidationRule::IsNumber,
        ValidationRule::IsObject,
        ValidationRule::IsString,
        ValidationRule::IsTimestamp,
        ValidationRule::IsUuid,
        ValidationRule::IsUuidArray,
        ValidationRule::IsItemFilterArray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::Required => "required",
            ValidationRule::Options => "options",
            ValidationRule::Between => "between",
            ValidationRule::IsBoolean => "isBoolean",
            ValidationRule::IsArray => "isArray",
            ValidationRule::IsNumber => "isNumber",
            ValidationRule::IsObject => "isObject",
            ValidationRule::IsString => "isString",
            ValidationRule::IsTimestamp => "isTimestamp",
            ValidationRule::IsUuid => "isUuid",
            ValidationRule::IsUuidArray => "isUuidArray",
            ValidationRule::IsItemFilterArray => "isItemFilterArray",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ValidationRule::ALL
            .into_iter()
            .find(|rule| rule.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown validation rule: {}", s)))
    }
}

fn label(field: &FieldData) -> &str {
    if field.label.trim().is_empty() {
        &field.key
    } else {
        &field.label
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn format_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn check(ok: bool, message: impl FnOnce() -> String) -> std::result::Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(message())
    }
}

fn is_timestamp(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64().is_some_and(|ts| ts >= 0) || n.as_u64().is_some(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => false,
    }
}

fn is_known_filter(filter: &DbFilter) -> bool {
    match filter {
        DbFilter::Single(single) => single.operator != FilterOperator::Unrecognized,
        DbFilter::Group(group) => group.filters.iter().all(is_known_filter),
    }
}

fn is_item_filter_array(value: &Value) -> bool {
    value.as_array().is_some_and(|filters| {
        filters.iter().all(|f| {
            serde_json::from_value::<DbFilter>(f.clone())
                .map(|filter| is_known_filter(&filter))
                .unwrap_or(false)
        })
    })
}

/// Check `value` against one rule of `field`
pub fn validate(rule: ValidationRule, value: &Value, field: &FieldData) -> std::result::Result<(), String> {
    let name = label(field);

    if rule == ValidationRule::Required {
        return check(!is_empty(value), || format!("{} is required", name));
    }
    if is_empty(value) {
        return Ok(());
    }

    match rule {
        ValidationRule::Required => Ok(()),
        ValidationRule::Options => {
            let allowed = field.option_values();
            if allowed.is_empty() {
                return Ok(());
            }
            let in_options = |v: &Value| allowed.iter().any(|opt| loose_eq(opt, v));
            let ok = match value {
                Value::Array(values) => values.iter().all(in_options),
                single => in_options(single),
            };
            check(ok, || {
                let names: Vec<String> = allowed
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect();
                format!("{} must be one of: {}", name, names.join(", "))
            })
        }
        ValidationRule::Between => {
            let (min, max) = match &field.validation {
                Some(opts) => (opts.min, opts.max),
                None => (None, None),
            };
            // Numbers compare by value, strings and arrays by length.
            // Numeric text counts as a number only on number fields.
            let measured = match value {
                Value::String(s) if field.field_type == FieldType::Number => {
                    as_number(value).unwrap_or(s.chars().count() as f64)
                }
                Value::String(s) => s.chars().count() as f64,
                Value::Array(a) => a.len() as f64,
                other => match as_number(other) {
                    Some(n) => n,
                    None => return Err(format!("{} must be a number", name)),
                },
            };
            match (min, max) {
                (Some(min), Some(max)) => check(measured >= min && measured <= max, || {
                    format!("{} must be between {} and {}", name, format_bound(min), format_bound(max))
                }),
                (Some(min), None) => {
                    check(measured >= min, || format!("{} must be at least {}", name, format_bound(min)))
                }
                (None, Some(max)) => {
                    check(measured <= max, || format!("{} must be at most {}", name, format_bound(max)))
                }
                (None, None) => Ok(()),
            }
        }
        ValidationRule::IsBoolean => check(value.is_boolean(), || format!("{} must be true or false", name)),
        ValidationRule::IsArray => check(value.is_array(), || format!("{} must be a list", name)),
        ValidationRule::IsNumber => check(as_number(value).is_some(), || format!("{} must be a number", name)),
        ValidationRule::IsObject => check(value.is_object(), || format!("{} must be an object", name)),
        ValidationRule::IsString => check(value.is_string(), || format!("{} must be text", name)),
        ValidationRule::IsTimestamp => check(is_timestamp(value), || format!("{} must be a timestamp", name)),
        ValidationRule::IsUuid => {
            check(value.as_str().is_some_and(is_uuid), || format!("{} must be a valid id", name))
        }
        ValidationRule::IsUuidArray => check(
            value.as_array().is_some_and(|ids| ids.iter().all(|id| id.as_str().is_some_and(is_uuid))),
            || format!("{} must be a list of valid ids", name),
        ),
        ValidationRule::IsItemFilterArray => {
            check(is_item_filter_array(value), || format!("{} must be a list of filters", name))
        }
    }
}

/// Rules that apply to `field`, in evaluation order
///
/// Derived from the validation options, the options list and the field
/// type, followed by any extra rule names the field lists. Unknown names
/// are skipped with a warning.
pub fn generate_input_rule_names(field: &FieldData) -> Vec<ValidationRule> {
    let mut rules = Vec::new();
    let opts = field.validation.clone().unwrap_or_default();

    if opts.required {
        rules.push(ValidationRule::Required);
    }

    let type_rule = match field.field_type {
        FieldType::Text | FieldType::Textarea => Some(ValidationRule::IsString),
        FieldType::Number => Some(ValidationRule::IsNumber),
        FieldType::Boolean => Some(ValidationRule::IsBoolean),
        FieldType::MultiSelect => Some(ValidationRule::IsArray),
        FieldType::Timestamp => Some(ValidationRule::IsTimestamp),
        FieldType::ItemSelect => Some(ValidationRule::IsUuid),
        FieldType::ItemSelectMultiple => Some(ValidationRule::IsUuidArray),
        FieldType::ItemFilters => Some(ValidationRule::IsItemFilterArray),
        FieldType::Object => Some(ValidationRule::IsObject),
        FieldType::Select | FieldType::Readonly | FieldType::Json | FieldType::Other => None,
    };
    rules.extend(type_rule);

    let has_options = field.options.as_ref().is_some_and(|o| !o.is_empty());
    if has_options || matches!(field.field_type, FieldType::Select | FieldType::MultiSelect) {
        rules.push(ValidationRule::Options);
    }
    if opts.min.is_some() || opts.max.is_some() {
        rules.push(ValidationRule::Between);
    }

    for name in &opts.rules {
        match name.parse::<ValidationRule>() {
            Ok(rule) => rules.push(rule),
            Err(e) => log::warn!("Field {}: {}", field.key, e),
        }
    }

    let mut seen = Vec::with_capacity(rules.len());
    rules.retain(|rule| {
        if seen.contains(rule) {
            false
        } else {
            seen.push(*rule);
            true
        }
    });
    rules
}

/// Every error message `value` produces for `field`
pub fn validate_field(field: &FieldData, value: Option<&Value>) -> Vec<String> {
    let value = value.unwrap_or(&Value::Null);
    generate_input_rule_names(field)
        .into_iter()
        .filter_map(|rule| validate(rule, value, field).err())
        .collect()
}

/// Validate an item against its fields, keyed by field key
///
/// Fields without errors are left out, so an empty map means valid.
pub fn validate_item(fields: &[FieldData], item: &Item) -> BTreeMap<String, Vec<String>> {
    fields
        .iter()
        .filter_map(|field| {
            let errors = validate_field(field, item.get(&field.key).as_ref());
            (!errors.is_empty()).then(|| (field.key.clone(), errors))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValidationOpts;
    use serde_json::json;

    fn field(field_type: FieldType, validation: FieldValidationOpts) -> FieldData {
        let mut field = FieldData::new("count", field_type);
        field.label = "Count".to_string();
        field.validation = Some(validation);
        field
    }

    #[test]
    fn test_rule_names_round_trip() {
        for rule in ValidationRule::ALL {
            assert_eq!(rule.as_str().parse::<ValidationRule>().unwrap(), rule);
        }
        assert!("isColour".parse::<ValidationRule>().is_err());
    }

    #[test]
    fn test_required() {
        let f = field(FieldType::Text, FieldValidationOpts { required: true, ..Default::default() });
        assert_eq!(validate(ValidationRule::Required, &json!("  "), &f), Err("Count is required".to_string()));
        assert!(validate(ValidationRule::Required, &json!([]), &f).is_err());
        assert!(validate(ValidationRule::Required, &json!(0), &f).is_ok());
        assert!(validate(ValidationRule::Required, &json!(false), &f).is_ok());
    }

    #[test]
    fn test_type_rules_skip_empty_values() {
        let f = FieldData::new("ref", FieldType::ItemSelect);
        assert!(validate(ValidationRule::IsUuid, &Value::Null, &f).is_ok());
        assert!(validate(ValidationRule::IsUuid, &json!(""), &f).is_ok());
        assert!(validate(ValidationRule::IsUuid, &json!("nope"), &f).is_err());
    }

    #[test]
    fn test_between() {
        let f = field(FieldType::Number, FieldValidationOpts { min: Some(1.0), max: Some(5.0), ..Default::default() });
        assert!(validate(ValidationRule::Between, &json!(3), &f).is_ok());
        assert!(validate(ValidationRule::Between, &json!("5"), &f).is_ok());
        assert_eq!(
            validate(ValidationRule::Between, &json!(6), &f),
            Err("Count must be between 1 and 5".to_string())
        );
        // Length for text
        assert!(validate(ValidationRule::Between, &json!("abcdef"), &f).is_err());

        let at_least = field(FieldType::Number, FieldValidationOpts { min: Some(2.5), ..Default::default() });
        assert_eq!(
            validate(ValidationRule::Between, &json!(1), &at_least),
            Err("Count must be at least 2.5".to_string())
        );
    }

    #[test]
    fn test_between_measures_numeric_text_by_length() {
        let mut zip = FieldData::new("zip", FieldType::Text);
        zip.validation = Some(FieldValidationOpts { min: Some(1.0), max: Some(10.0), ..Default::default() });

        assert!(validate(ValidationRule::Between, &json!("90210"), &zip).is_ok());
        assert_eq!(
            validate(ValidationRule::Between, &json!("00441234567890"), &zip),
            Err("zip must be between 1 and 10".to_string())
        );
    }

    #[test]
    fn test_options() {
        let mut f = FieldData::new("status", FieldType::Select);
        f.options = Some(vec![json!("draft"), json!({ "label": "Live", "value": "live" })]);

        assert!(validate(ValidationRule::Options, &json!("live"), &f).is_ok());
        assert!(validate(ValidationRule::Options, &json!(["draft", "live"]), &f).is_ok());
        assert_eq!(
            validate(ValidationRule::Options, &json!("archived"), &f),
            Err("status must be one of: draft, live".to_string())
        );
    }

    #[test]
    fn test_timestamp_and_uuid_arrays() {
        let f = FieldData::new("at", FieldType::Timestamp);
        assert!(validate(ValidationRule::IsTimestamp, &json!(1_700_000_000), &f).is_ok());
        assert!(validate(ValidationRule::IsTimestamp, &json!("2024-05-01T10:00:00Z"), &f).is_ok());
        assert!(validate(ValidationRule::IsTimestamp, &json!(-5), &f).is_err());
        assert!(validate(ValidationRule::IsTimestamp, &json!("yesterday"), &f).is_err());

        let ids = json!(["0a6f3c1e-1111-4c1d-8e7f-001122334455"]);
        assert!(validate(ValidationRule::IsUuidArray, &ids, &f).is_ok());
        assert!(validate(ValidationRule::IsUuidArray, &json!(["0a6f3c1e", 3]), &f).is_err());
    }

    #[test]
    fn test_item_filter_array() {
        let f = FieldData::new("filters", FieldType::ItemFilters);
        let good = json!([
            { "key": "typeId", "operator": "isEqual", "value": "Page" },
            { "groupOperator": "or", "filters": [{ "key": "a", "operator": "in", "value": [1, 2] }] }
        ]);
        assert!(validate(ValidationRule::IsItemFilterArray, &good, &f).is_ok());

        let unknown = json!([{ "key": "a", "operator": "startsWith", "value": "x" }]);
        assert!(validate(ValidationRule::IsItemFilterArray, &unknown, &f).is_err());
        assert!(validate(ValidationRule::IsItemFilterArray, &json!({ "key": "a" }), &f).is_err());
    }

    #[test]
    fn test_generate_input_rule_names() {
        let mut f = field(
            FieldType::Number,
            FieldValidationOpts {
                required: true,
                max: Some(10.0),
                rules: vec!["isNumber".to_string(), "isColour".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(
            generate_input_rule_names(&f),
            vec![ValidationRule::Required, ValidationRule::IsNumber, ValidationRule::Between]
        );

        f.field_type = FieldType::MultiSelect;
        f.validation = None;
        assert_eq!(generate_input_rule_names(&f), vec![ValidationRule::IsArray, ValidationRule::Options]);

        assert!(generate_input_rule_names(&FieldData::new("raw", FieldType::Json)).is_empty());
    }

    #[test]
    fn test_validate_item() {
        let title = {
            let mut f = FieldData::new("title", FieldType::Text);
            f.validation = Some(FieldValidationOpts { required: true, ..Default::default() });
            f
        };
        let count = field(FieldType::Number, FieldValidationOpts { max: Some(3.0), ..Default::default() });

        let item = Item::new("Recipe").with_field("count", "many");
        let errors = validate_item(&[title.clone(), count.clone()], &item);
        assert_eq!(errors["title"], vec!["title is required".to_string()]);
        assert_eq!(errors["count"].len(), 2);

        let valid = Item::new("Recipe").with_field("title", "Soup").with_field("count", 2);
        assert!(validate_item(&[title, count], &valid).is_empty());
    }
}
