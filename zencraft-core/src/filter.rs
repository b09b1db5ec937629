//! Filter trees evaluated against plain JSON records
//!
//! A filter is either a leaf `{key, operator, value}` or a group
//! `{groupOperator, filters}`. The top level of a filter list is an implicit
//! AND; groups combine their children with their own operator and may nest
//! without limit.
//!
//! # Example
//!
//! ```rust,ignore
//! use zencraft_core::filter::{DbFilter, DbFilterHandler, FilterOperator};
//! use serde_json::json;
//!
//! let mut handler = DbFilterHandler::default();
//! handler.update_filter(DbFilter::single("typeId", FilterOperator::IsEqual, "Page"));
//! handler.update_filter(DbFilter::or(vec![
//!     DbFilter::single("status", FilterOperator::IsEqual, "live"),
//!     DbFilter::single("title", FilterOperator::FuzzyEqual, "home"),
//! ]));
//!
//! assert!(handler.matches(&json!({ "typeId": "Page", "title": "Homepage" })));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Comparison applied by a leaf filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    IsEqual,
    IsNotEqual,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
    FuzzyEqual,
    /// Any operator string outside the known set. Such filters pass.
    #[serde(other)]
    Unrecognized,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::IsEqual => "isEqual",
            FilterOperator::IsNotEqual => "isNotEqual",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::ArrayContains => "arrayContains",
            FilterOperator::ArrayContainsAny => "arrayContainsAny",
            FilterOperator::FuzzyEqual => "fuzzyEqual",
            FilterOperator::Unrecognized => "unrecognized",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = std::convert::Infallible;

    /// Never fails; unknown names become [`FilterOperator::Unrecognized`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_value(Value::String(s.to_string())).unwrap_or(FilterOperator::Unrecognized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

/// Leaf comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleFilter {
    /// Record key, or a dotted path into nested objects
    pub key: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

/// Group of filters combined by AND or OR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFilterGroup {
    pub group_operator: GroupOperator,
    pub filters: Vec<DbFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbFilter {
    Group(DbFilterGroup),
    Single(SingleFilter),
}

impl DbFilter {
    pub fn single(key: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        DbFilter::Single(SingleFilter { key: key.into(), operator, value: value.into() })
    }

    pub fn and(filters: Vec<DbFilter>) -> Self {
        DbFilter::Group(DbFilterGroup { group_operator: GroupOperator::And, filters })
    }

    pub fn or(filters: Vec<DbFilter>) -> Self {
        DbFilter::Group(DbFilterGroup { group_operator: GroupOperator::Or, filters })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            DbFilter::Single(f) => Some(&f.key),
            DbFilter::Group(_) => None,
        }
    }

    /// Evaluate this filter against a record
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            DbFilter::Single(f) => evaluate_single(f, record),
            DbFilter::Group(g) => match g.group_operator {
                GroupOperator::And => g.filters.iter().all(|f| f.matches(record)),
                GroupOperator::Or => g.filters.iter().any(|f| f.matches(record)),
            },
        }
    }
}

/// Holds the filter list of a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbFilterHandler {
    pub filters: Vec<DbFilter>,
}

impl DbFilterHandler {
    pub fn new(filters: Vec<DbFilter>) -> Self {
        Self { filters }
    }

    /// Replace the first leaf filter with the same key, or append
    ///
    /// Groups have no key and are always appended.
    pub fn update_filter(&mut self, filter: DbFilter) {
        if let Some(key) = filter.key() {
            if let Some(existing) = self.filters.iter_mut().find(|f| f.key() == Some(key)) {
                *existing = filter;
                return;
            }
        }
        self.filters.push(filter);
    }

    pub fn update_filters(&mut self, filters: impl IntoIterator<Item = DbFilter>) {
        for filter in filters {
            self.update_filter(filter);
        }
    }

    /// Drop every top-level leaf filter with this key
    pub fn remove_filter(&mut self, key: &str) {
        self.filters.retain(|f| f.key() != Some(key));
    }

    pub fn has_filter(&self, key: &str) -> bool {
        self.filters.iter().any(|f| f.key() == Some(key))
    }

    pub fn matches(&self, record: &Value) -> bool {
        Self::traverse_filters(&self.filters, record)
    }

    /// Every filter must match; an empty list matches everything
    pub fn traverse_filters(filters: &[DbFilter], record: &Value) -> bool {
        filters.iter().all(|f| f.matches(record))
    }

    pub fn into_filters(self) -> Vec<DbFilter> {
        self.filters
    }
}

/// Resolve a key or dotted path in a record
pub fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(key) {
        return Some(value);
    }
    if !key.contains('.') {
        return None;
    }
    key.split('.').try_fold(record, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        other => other.get(segment),
    })
}

fn evaluate_single(filter: &SingleFilter, record: &Value) -> bool {
    let actual = lookup(record, &filter.key).unwrap_or(&Value::Null);
    let expected = &filter.value;

    match filter.operator {
        FilterOperator::IsEqual => loose_eq(actual, expected),
        FilterOperator::IsNotEqual => !loose_eq(actual, expected),
        FilterOperator::In => value_in(actual, expected),
        FilterOperator::NotIn => !value_in(actual, expected),
        FilterOperator::ArrayContains => match actual {
            Value::Array(items) => items.iter().any(|v| loose_eq(v, expected)),
            Value::String(s) => s.contains(&display_string(expected)),
            _ => false,
        },
        FilterOperator::ArrayContainsAny => {
            let wanted = as_list(expected);
            match actual {
                Value::Array(items) => items.iter().any(|v| wanted.iter().any(|w| loose_eq(v, w))),
                Value::String(s) => wanted.iter().any(|w| s.contains(&display_string(w))),
                _ => false,
            }
        }
        FilterOperator::FuzzyEqual => match actual {
            Value::String(s) => s.to_lowercase().contains(&display_string(expected).to_lowercase()),
            _ => false,
        },
        FilterOperator::Unrecognized => {
            log::warn!("Unrecognized operator on filter key '{}', filter passes", filter.key);
            true
        }
    }
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn value_in(actual: &Value, expected: &Value) -> bool {
    let allowed = as_list(expected);
    match actual {
        Value::Array(items) => items.iter().any(|v| allowed.iter().any(|a| loose_eq(v, a))),
        other => allowed.iter().any(|a| loose_eq(other, a)),
    }
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Loose equality between two JSON values
///
/// Numbers, booleans and numeric strings compare numerically, `null` only
/// equals `null` (a missing key reads as `null`), arrays and objects compare
/// structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(_) | Value::Bool(_) | Value::String(_), Value::Number(_) | Value::Bool(_) | Value::String(_)) => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}
