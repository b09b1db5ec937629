pub mod items;
pub mod seed;
pub mod source;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use uuid::Uuid;
use zencraft_core::{DbFilter, FilterOperator};

/// Parse `key:operator:value`
///
/// The value is read as JSON when it parses, so `count:isEqual:3` compares
/// a number and `tags:arrayContainsAny:["a","b"]` a list. Anything else is
/// taken as a plain string.
pub fn parse_filter(raw: &str) -> Result<DbFilter> {
    let mut parts = raw.splitn(3, ':');
    let (Some(key), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("filter '{}' must look like key:operator:value", raw);
    };
    if key.is_empty() {
        bail!("filter '{}' has an empty key", raw);
    }

    let operator: FilterOperator = operator.parse().unwrap_or(FilterOperator::Unrecognized);
    if operator == FilterOperator::Unrecognized {
        bail!("unknown filter operator in '{}'", raw);
    }

    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(DbFilter::single(key, operator, value))
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("'{}' is not an item id", raw))
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
