//! Page bookkeeping for searches
//!
//! [`PaginationHandler`] tracks `page`, `pageSize` and the total row count of a
//! result set and drives "load every page" loops. Pages are 1-based.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Pagination options as they travel with a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for DbPagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            total_rows: None,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl DbPagination {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self { page: page.max(1), page_size: page_size.max(1), ..Default::default() }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedItemResponse<T = crate::item::Item> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub pagination: DbPagination,
}

impl<T> PaginatedItemResponse<T> {
    /// No results, no more pages
    pub fn empty(pagination: DbPagination) -> Self {
        Self { results: Vec::new(), total_items: 0, has_more: false, pagination }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedItemResponse<U> {
        PaginatedItemResponse {
            results: self.results.into_iter().map(f).collect(),
            total_items: self.total_items,
            has_more: self.has_more,
            pagination: self.pagination,
        }
    }
}

impl<T> Default for PaginatedItemResponse<T> {
    fn default() -> Self {
        Self::empty(DbPagination::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationHandler {
    pub pagination: DbPagination,
}

impl PaginationHandler {
    pub fn new(initial: Option<DbPagination>) -> Self {
        let mut pagination = initial.unwrap_or_default();
        pagination.page = pagination.page.max(1);
        pagination.page_size = pagination.page_size.max(1);
        Self { pagination }
    }

    pub fn with_page_size(page_size: u32) -> Self {
        Self::new(Some(DbPagination::page(DEFAULT_PAGE, page_size)))
    }

    pub fn set_total(&mut self, total: u64) {
        self.pagination.total_rows = Some(total);
    }

    pub fn set_page(&mut self, page: u32) {
        self.pagination.page = page.max(1);
    }

    pub fn increment_page(&mut self) {
        self.pagination.page = self.pagination.page.saturating_add(1);
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.pagination.page_size = page_size.max(1);
    }

    pub fn set_sort(&mut self, sort_by: Option<String>, sort_order: Option<SortOrder>) {
        self.pagination.sort_by = sort_by;
        self.pagination.sort_order = sort_order;
    }

    fn rows_through_page(&self) -> u64 {
        u64::from(self.pagination.page) * u64::from(self.pagination.page_size)
    }

    /// True once the current page reaches the known total
    pub fn is_done(&self) -> bool {
        self.pagination.total_rows.is_some_and(|total| self.rows_through_page() >= total)
    }

    pub fn has_more(&self) -> bool {
        self.pagination.total_rows.is_some_and(|total| self.rows_through_page() < total)
    }

    /// Index of the first row of the current page
    pub fn offset(&self) -> usize {
        (u64::from(self.pagination.page.saturating_sub(1)) * u64::from(self.pagination.page_size)) as usize
    }

    pub fn page_count(&self) -> Option<u64> {
        let size = u64::from(self.pagination.page_size);
        self.pagination.total_rows.map(|total| total.div_ceil(size))
    }

    /// The rows of the current page
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        rows.iter()
            .skip(self.offset())
            .take(self.pagination.page_size as usize)
            .cloned()
            .collect()
    }
}

/// Order records by a key; missing and null values sort last in both orders
pub fn sort_records(records: &mut [Value], sort_by: &str, order: SortOrder) {
    records.sort_by(|a, b| {
        match (present(crate::filter::lookup(a, sort_by)), present(crate::filter::lookup(b, sort_by))) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => match order {
                SortOrder::Asc => compare_values(x, y),
                SortOrder::Desc => compare_values(x, y).reverse(),
            },
        }
    });
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let ph = PaginationHandler::new(None);
        assert_eq!(ph.pagination.page, 1);
        assert_eq!(ph.pagination.page_size, 10);
        assert!(!ph.is_done());
        assert!(!ph.has_more());
    }

    #[test]
    fn test_is_done() {
        let mut ph = PaginationHandler::new(Some(DbPagination::page(2, 10)));
        ph.set_total(15);
        assert!(ph.is_done());
        assert!(!ph.has_more());

        ph.set_page(1);
        assert!(!ph.is_done());
        assert!(ph.has_more());
    }

    #[test]
    fn test_clamps_to_one() {
        let mut ph = PaginationHandler::new(Some(DbPagination { page: 0, page_size: 0, ..Default::default() }));
        assert_eq!(ph.pagination.page, 1);
        assert_eq!(ph.pagination.page_size, 1);

        ph.set_page(0);
        ph.set_page_size(0);
        assert_eq!(ph.pagination.page, 1);
        assert_eq!(ph.pagination.page_size, 1);
    }

    #[test]
    fn test_slice_and_page_count() {
        let rows: Vec<u32> = (0..25).collect();
        let mut ph = PaginationHandler::with_page_size(10);
        ph.set_total(rows.len() as u64);

        assert_eq!(ph.page_count(), Some(3));
        ph.increment_page();
        ph.increment_page();
        assert_eq!(ph.offset(), 20);
        assert_eq!(ph.slice(&rows), vec![20, 21, 22, 23, 24]);
        assert!(ph.is_done());
    }

    #[test]
    fn test_wire_form() {
        let pagination: DbPagination = serde_json::from_value(json!({ "pageSize": 50, "sortOrder": "desc" })).unwrap();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.page_size, 50);
        assert_eq!(pagination.sort_order, Some(SortOrder::Desc));
    }

    #[test]
    fn test_sort_records() {
        let mut records = vec![json!({ "n": 3 }), json!({}), json!({ "n": 1 }), json!({ "n": 2 })];
        sort_records(&mut records, "n", SortOrder::Asc);
        assert_eq!(records[0]["n"], 1);
        assert_eq!(records[3], json!({}));

        records.push(json!({ "n": null }));
        sort_records(&mut records, "n", SortOrder::Desc);
        assert_eq!(records[0]["n"], 3);
        assert_eq!(records[2]["n"], 1);
        assert!(records[3..].iter().all(|r| r["n"].is_null()));
    }
}
