//! Data table component types.
//!
//! These types define the columns, rows and pagination of the admin tables.

use serde::Deserialize;

use crate::api::Page;

/// Rows per admin table page.
pub const PER_PAGE: u32 = 20;

/// Column definition for a data table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// API field the column sorts on.
    pub key: &'static str,
    /// Display label for the column header.
    pub label: &'static str,
    /// Whether the column is sortable.
    pub sortable: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub const fn sortable(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: true,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: false,
        }
    }
}

/// One rendered table row.
#[derive(Debug, Clone)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<String>,
}

/// Query string of a table page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    pub page: Option<u32>,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub sort: String,
}

impl TableQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Parameters for the API list call.
    #[must_use]
    pub fn api_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page().to_string()),
            ("limit", PER_PAGE.to_string()),
            ("q", self.q.trim().to_string()),
            ("sort", self.sort.clone()),
        ]
    }
}

/// Pagination links for a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pagination {
    /// Build links for `page`, keeping the non-empty `params` in each URL.
    #[must_use]
    pub fn new<T>(path: &str, page: &Page<T>, params: &[(&str, &str)]) -> Self {
        let total_pages = page.total_pages();
        let current = page.page.min(total_pages);
        let link = |target: u32| {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
                query.append_pair(key, value);
            }
            query.append_pair("page", &target.to_string());
            format!("{path}?{}", query.finish())
        };

        Self {
            page: current,
            total_pages,
            total: page.total,
            prev_url: (current > 1).then(|| link(current - 1)),
            next_url: (current < total_pages).then(|| link(current + 1)),
        }
    }

    /// Whether there is more than one page.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn page(total: u64, page: u32, per_page: u32) -> Page<()> {
        Page {
            items: Vec::new(),
            total,
            page,
            per_page,
        }
    }

    #[test]
    fn test_pagination_links() {
        let p = Pagination::new("/admin/makes", &page(45, 2, 20), &[("q", "sub"), ("sort", "")]);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.prev_url.as_deref(), Some("/admin/makes?q=sub&page=1"));
        assert_eq!(p.next_url.as_deref(), Some("/admin/makes?q=sub&page=3"));
        assert!(p.is_paged());
    }

    #[test]
    fn test_pagination_edges() {
        let first = Pagination::new("/tires", &page(20, 1, 20), &[]);
        assert_eq!(first.total_pages, 1);
        assert!(first.prev_url.is_none() && first.next_url.is_none());
        assert!(!first.is_paged());

        // A page past the end clamps to the last page
        let past = Pagination::new("/tires", &page(30, 9, 10), &[]);
        assert_eq!(past.page, 3);
        assert!(past.next_url.is_none());
    }

    #[test]
    fn test_table_query_defaults() {
        let query = TableQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.api_params()[1], ("limit", "20".to_string()));
    }
}
