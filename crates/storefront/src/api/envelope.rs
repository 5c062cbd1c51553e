//! List response decoding.
//!
//! The API answers list requests either with a bare JSON array or with an
//! envelope `{data|docs|items, total, page, limit}`. Both decode to [`Page`].

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keys that may hold the items of an envelope.
const ITEM_KEYS: [&str; 3] = ["data", "docs", "items"];

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching documents across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// A first page with nothing on it.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 1,
        }
    }

    /// Number of pages, at least 1.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Errors decoding a list body.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("expected an array or an object with data, docs or items")]
    UnknownShape,
    #[error("invalid list item: {0}")]
    Item(#[from] serde_json::Error),
}

fn number<N: TryFrom<u64>>(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<N> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_u64))
        .and_then(|n| N::try_from(n).ok())
}

/// Decode a list body in any accepted shape.
///
/// # Errors
///
/// Returns an error when the body is neither shape or an item fails to decode.
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<Page<T>, EnvelopeError> {
    match body {
        Value::Array(values) => {
            let items: Vec<T> = serde_json::from_value(Value::Array(values))?;
            let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
            Ok(Page {
                total: u64::from(count),
                page: 1,
                per_page: count,
                items,
            })
        }
        Value::Object(mut object) => {
            let values = ITEM_KEYS
                .iter()
                .find_map(|key| object.remove(*key))
                .ok_or(EnvelopeError::UnknownShape)?;
            let items: Vec<T> = serde_json::from_value(values)?;
            let count = u32::try_from(items.len()).unwrap_or(u32::MAX);

            Ok(Page {
                total: number::<u64>(&object, &["total", "totalDocs", "count"])
                    .unwrap_or(u64::from(count)),
                page: number::<u32>(&object, &["page"]).unwrap_or(1).max(1),
                per_page: number::<u32>(&object, &["limit", "per_page"]).unwrap_or(count),
                items,
            })
        }
        _ => Err(EnvelopeError::UnknownShape),
    }
}
