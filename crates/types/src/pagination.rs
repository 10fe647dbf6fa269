use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json_path::{select_path, value_as_u64};

/// Where a collection's pagination counters are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationSource {
    /// Dotted paths into the decoded response body.
    #[default]
    Body,
    /// Response header names.
    Headers,
}

/// Field names used to locate pagination counters.
///
/// Depending on [`PaginationSource`], each field is either a header name
/// (matched case-insensitively) or a dotted path into the decoded body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationFields {
    #[serde(default)]
    pub source: PaginationSource,
    #[serde(default)]
    pub total_results: Option<String>,
    #[serde(default)]
    pub results_per_page: Option<String>,
    #[serde(default)]
    pub current_page: Option<String>,
}

impl PaginationFields {
    /// Header-sourced pagination using the common `X-Total-Count` family.
    pub fn headers() -> Self {
        Self {
            source: PaginationSource::Headers,
            total_results: Some("X-Total-Count".into()),
            results_per_page: Some("X-Per-Page".into()),
            current_page: Some("X-Page".into()),
        }
    }

    /// Body-sourced pagination from explicit dotted paths.
    pub fn body(total_results: impl Into<String>, results_per_page: impl Into<String>, current_page: impl Into<String>) -> Self {
        Self {
            source: PaginationSource::Body,
            total_results: Some(total_results.into()),
            results_per_page: Some(results_per_page.into()),
            current_page: Some(current_page.into()),
        }
    }

    /// Resolve counters for a page of `item_count` items.
    ///
    /// `headers` must be keyed by lowercase header name. Counters that cannot
    /// be found fall back to a single page holding every item.
    pub fn resolve(&self, body: &Value, headers: &IndexMap<String, String>, item_count: usize) -> Pagination {
        let lookup = |field: &Option<String>| -> Option<u64> {
            let field = field.as_deref()?;
            match self.source {
                PaginationSource::Headers => headers
                    .get(&field.to_ascii_lowercase())
                    .and_then(|raw| raw.trim().parse::<u64>().ok()),
                PaginationSource::Body => select_path(body, field).and_then(value_as_u64),
            }
        };

        let item_count = item_count as u64;
        Pagination {
            total_results: lookup(&self.total_results).unwrap_or(item_count),
            results_per_page: lookup(&self.results_per_page).unwrap_or(item_count),
            current_page: lookup(&self.current_page).unwrap_or(1).max(1),
        }
    }
}

/// Pagination counters attached to a [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total_results: u64,
    pub results_per_page: u64,
    pub current_page: u64,
}

impl Pagination {
    pub fn total_pages(&self) -> u64 {
        if self.results_per_page == 0 {
            return 1;
        }
        self.total_results.div_ceil(self.results_per_page).max(1)
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }
}

/// A mapped list of items plus its pagination counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub items: Vec<Value>,
    pub pagination: Pagination,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_reads_headers_case_insensitively() {
        let headers = IndexMap::from([
            ("x-total-count".to_string(), "45".to_string()),
            ("x-per-page".to_string(), "20".to_string()),
            ("x-page".to_string(), "2".to_string()),
        ]);
        let pagination = PaginationFields::headers().resolve(&Value::Null, &headers, 20);

        assert_eq!(pagination.total_results, 45);
        assert_eq!(pagination.total_pages(), 3);
        assert!(pagination.has_next_page());
    }

    #[test]
    fn resolve_reads_body_paths() {
        let body = json!({"meta": {"total": "3", "per_page": 2, "page": 2}});
        let pagination = PaginationFields::body("meta.total", "meta.per_page", "meta.page").resolve(&body, &IndexMap::new(), 1);

        assert_eq!(
            pagination,
            Pagination {
                total_results: 3,
                results_per_page: 2,
                current_page: 2
            }
        );
        assert!(!pagination.has_next_page());
    }

    #[test]
    fn resolve_falls_back_to_single_page() {
        let pagination = PaginationFields::default().resolve(&json!([1, 2, 3]), &IndexMap::new(), 3);
        assert_eq!(pagination.total_results, 3);
        assert_eq!(pagination.total_pages(), 1);
        assert_eq!(pagination.current_page, 1);
    }
}
