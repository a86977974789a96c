//! Storage port: document persistence for one named collection.
//!
//! Repositories work on untyped JSON documents; typing happens in
//! [`Module`](crate::module::Module). Only modules call repositories.

use std::sync::Arc;

use serde_json::{Map, Value};
use tendril_domain::error::{AppError, ValidationError};
use tendril_domain::id;

/// A stored record in its JSON form.
pub type Document = Map<String, Value>;

/// Field-equality filter over documents. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Document,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `(field, value)` pairs to match.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Whether `document` satisfies every equality.
    ///
    /// Numbers compare by value, so `35` matches a stored `35.0`.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.fields.iter().all(|(field, expected)| {
            document
                .get(field)
                .is_some_and(|actual| same_value(actual, expected))
        })
    }
}

fn same_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

impl From<Document> for Filter {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Persistence contract for one collection.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Name of the collection this repository stores.
    fn collection(&self) -> &str;

    /// Load a document by id.
    async fn find_one(&self, id: &str) -> Result<Option<Document>, AppError>;

    /// Load every document matching `filter`.
    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, AppError>;

    /// Persist a new document, assigning an id when absent.
    async fn create(&self, document: Document) -> Result<Document, AppError>;

    /// Persist several documents.
    async fn create_many(&self, documents: Vec<Document>) -> Result<Vec<Document>, AppError> {
        let mut created = Vec::with_capacity(documents.len());
        for document in documents {
            created.push(self.create(document).await?);
        }
        Ok(created)
    }

    /// Shallow-merge `patch` into the document with `id`.
    ///
    /// Returns `None` when no document matched.
    async fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, AppError>;

    /// Remove the document with `id`, returning it. `None` when absent.
    async fn delete(&self, id: &str) -> Result<Option<Document>, AppError>;
}

/// Factory handing out one repository per collection.
pub trait Database: Send + Sync {
    fn repository(&self, collection: &str) -> Arc<dyn Repository>;
}

/// Ensure `document` carries a usable `id`, generating one when it is
/// absent, null or empty. Numeric ids are stored as strings.
#[must_use]
pub fn assign_id(mut document: Document) -> Document {
    let id = document
        .get(id::ID_FIELD)
        .and_then(id::from_value)
        .unwrap_or_else(id::generate);
    document.insert(id::ID_FIELD.to_string(), Value::String(id));
    document
}

/// Error for a create whose id is already taken.
#[must_use]
pub fn duplicate_id(id: &str) -> AppError {
    ValidationError::field(format!("/{}", id::ID_FIELD), format!("{id} already exists")).into()
}

/// Shallow merge of `patch` into `target`. The target's id is kept.
pub fn merge(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        if key == id::ID_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn should_generate_id_when_absent() {
        let document = assign_id(doc(json!({"name": "a"})));
        assert!(id::is_generated(document["id"].as_str().unwrap()));
    }

    #[test]
    fn should_generate_id_when_null() {
        let document = assign_id(doc(json!({"id": null, "name": "a"})));
        assert!(id::is_generated(document["id"].as_str().unwrap()));
    }

    #[test]
    fn should_keep_supplied_id() {
        let document = assign_id(doc(json!({"id": "w1"})));
        assert_eq!(document["id"], "w1");
        let document = assign_id(doc(json!({"id": 7})));
        assert_eq!(document["id"], "7");
    }

    #[test]
    fn should_match_numbers_by_value_when_representations_differ() {
        let stored = doc(json!({"value": 35.0, "size": 3}));
        assert!(Filter::new().eq("value", 35).matches(&stored));
        assert!(Filter::new().eq("size", 3.0).matches(&stored));
        assert!(!Filter::new().eq("value", 35.5).matches(&stored));
        assert!(!Filter::new().eq("value", "35").matches(&stored));
    }

    #[test]
    fn should_report_duplicate_id_as_validation_error() {
        let err = duplicate_id("w1");
        assert_eq!(err.status(), 422);
        assert_eq!(err.details().unwrap()[0]["path"], "/id");
    }

    #[test]
    fn should_merge_shallowly_and_keep_id() {
        let mut target = doc(json!({"id": "w1", "name": "a", "meta": {"x": 1, "y": 2}}));
        merge(&mut target, doc(json!({"id": "other", "meta": {"x": 3}})));
        assert_eq!(target["id"], "w1");
        assert_eq!(target["name"], "a");
        assert_eq!(target["meta"], json!({"x": 3}));
    }

    #[test]
    fn should_match_every_field_of_filter() {
        let filter = Filter::new().eq("deviceId", "d1").eq("kind", "value");
        assert!(filter.matches(&doc(json!({"deviceId": "d1", "kind": "value", "x": 1}))));
        assert!(!filter.matches(&doc(json!({"deviceId": "d1"}))));
        assert!(Filter::new().matches(&doc(json!({}))));
    }
}
