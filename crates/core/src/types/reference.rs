//! References that the API returns either populated or as a bare id.
//!
//! The same field (`tire.make`, `trim.model`, ...) arrives as `"64f1..."`
//! from one endpoint and as `{"_id": "64f1...", "make": "Michelin"}` from
//! another. [`Ref`] accepts both shapes and always yields an id.

use serde::{Deserialize, Serialize};

/// A document that has an API id and a human readable label.
pub trait Document {
    /// The `_id` of the document.
    fn document_id(&self) -> &str;

    /// Text shown in tables, selects and invoices.
    fn label(&self) -> String;
}

/// A reference to another document, populated or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    /// Only the id was returned.
    Id(String),
    /// The API populated the referenced document.
    Populated(T),
}

impl<T: Document> Ref<T> {
    /// The referenced document id, whichever shape was received.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Populated(doc) => doc.document_id(),
        }
    }

    /// The populated document, if the API sent one.
    #[must_use]
    pub const fn populated(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Populated(doc) => Some(doc),
        }
    }

    /// The populated document, or the one in `catalog` with a matching id.
    #[must_use]
    pub fn resolve<'a>(&'a self, catalog: &'a [T]) -> Option<&'a T> {
        match self {
            Self::Id(id) => catalog.iter().find(|doc| doc.document_id() == id),
            Self::Populated(doc) => Some(doc),
        }
    }

    /// Label of the populated document, or the bare id.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Id(id) => id.clone(),
            Self::Populated(doc) => doc.label(),
        }
    }
}

impl<T> From<String> for Ref<T> {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Make;

    #[test]
    fn test_ref_accepts_bare_id() {
        let r: Ref<Make> = serde_json::from_str("\"m1\"").unwrap();
        assert_eq!(r.id(), "m1");
        assert!(r.populated().is_none());
        assert_eq!(r.label(), "m1");
    }

    #[test]
    fn test_ref_accepts_populated_document() {
        let r: Ref<Make> = serde_json::from_str(r#"{"_id":"m1","make":"Toyota"}"#).unwrap();
        assert_eq!(r.id(), "m1");
        assert_eq!(r.populated().map(|m| m.make.as_str()), Some("Toyota"));
        assert_eq!(r.label(), "Toyota");
    }

    #[test]
    fn test_ref_serializes_in_received_shape() {
        let r: Ref<Make> = Ref::Id("m1".to_string());
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"m1\"");
    }
}
