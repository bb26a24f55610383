//! Opaque structured configuration/input documents.
//!
//! A `Document` wraps a `serde_json::Value` tree. Equality is defined
//! over the canonical serialized form rather than structural `Value`
//! equality: two documents are equal iff their serialized forms are
//! equal.
//!
//! `serde_json`'s `preserve_order` feature is enabled workspace-wide
//! (see the root `Cargo.toml`) so that a parsed mapping keeps its
//! source key order on round-trip, matching the "ordered mapping"
//! value kind this type is meant to model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not parse document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Document {
    /// An empty document, `{}`.
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    /// Wraps an already-parsed `serde_json::Value`. A bare `null` is
    /// normalized to the empty document, same as `parse`.
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            Self::empty()
        } else {
            Self(value)
        }
    }

    pub fn parse(s: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::from_value(value))
    }

    /// Canonical string form; an empty document renders as `{}`.
    pub fn to_string_canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.to_string_canonical() == other.to_string_canonical()
    }
}

impl Eq for Document {}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_serializes_to_braces() {
        assert_eq!(Document::empty().to_string_canonical(), "{}");
        assert_eq!(Document::default().to_string_canonical(), "{}");
    }

    #[test]
    fn null_normalizes_to_empty() {
        let parsed = Document::parse("null").unwrap();
        assert_eq!(parsed, Document::empty());
    }

    #[test]
    fn round_trips_through_string() {
        let doc = Document::parse(r#"{"a":1,"b":[1,2,3]}"#).unwrap();
        let reparsed = Document::parse(&doc.to_string_canonical()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn mapping_key_order_is_preserved_on_round_trip() {
        let doc = Document::parse(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&str> = doc
            .as_value()
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn equality_is_by_serialized_form() {
        let a = Document::parse(r#"{"x":1}"#).unwrap();
        let b = Document::parse(r#"{"x":1}"#).unwrap();
        let c = Document::parse(r#"{"x":2}"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
