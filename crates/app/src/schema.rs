//! Entity schemas: the four JSON-Schema validators of a module.
//!
//! Each of `create`, `read`, `update` and `query` is optional; an absent
//! validator performs no check. Schema documents are compiled once, when the
//! [`EntitySchema`] is built.

use std::collections::HashMap;
use std::fmt;

use jsonschema::JSONSchema;
use serde_json::{Map, Value};
use tendril_domain::error::{AppError, FieldIssue, ValidationError};

use crate::ports::Document;

/// Which payload a validator applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Create,
    Read,
    Update,
    Query,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Query => "query",
        })
    }
}

struct Validator {
    document: Value,
    compiled: JSONSchema,
}

impl Validator {
    fn compile(kind: SchemaKind, document: Value) -> Result<Self, AppError> {
        let compiled = JSONSchema::options()
            .compile(&document)
            .map_err(|err| AppError::internal(format!("invalid {kind} schema: {err}")))?;
        Ok(Self { document, compiled })
    }
}

/// Validators for one entity.
#[derive(Default)]
pub struct EntitySchema {
    validators: HashMap<SchemaKind, Validator>,
}

impl EntitySchema {
    /// A schema without any validator; every payload passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the validator for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when `document` is not a valid schema.
    pub fn with(mut self, kind: SchemaKind, document: Value) -> Result<Self, AppError> {
        self.validators
            .insert(kind, Validator::compile(kind, document)?);
        Ok(self)
    }

    /// Derive all four validators from the schema of a persisted record.
    ///
    /// - `read` is the record schema itself;
    /// - `create` drops `id` from `required`, ids being assigned on persist;
    /// - `update` and `query` drop `required` entirely.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when `record` is not a valid schema.
    pub fn from_record(record: Value) -> Result<Self, AppError> {
        let create = without_required(&record, |field| field != "id");
        let partial = without_required(&record, |_| false);
        Self::new()
            .with(SchemaKind::Read, record)?
            .with(SchemaKind::Create, create)?
            .with(SchemaKind::Update, partial.clone())?
            .with(SchemaKind::Query, partial)
    }

    /// Raw schema document for `kind`, if declared.
    #[must_use]
    pub fn document(&self, kind: SchemaKind) -> Option<&Value> {
        self.validators.get(&kind).map(|v| &v.document)
    }

    #[must_use]
    pub fn has(&self, kind: SchemaKind) -> bool {
        self.validators.contains_key(&kind)
    }

    /// Check `payload` against the validator for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn validate(&self, kind: SchemaKind, payload: &Value) -> Result<(), ValidationError> {
        let Some(validator) = self.validators.get(&kind) else {
            return Ok(());
        };
        if let Err(errors) = validator.compiled.validate(payload) {
            let issues: Vec<FieldIssue> = errors
                .map(|err| FieldIssue {
                    path: err.instance_path.to_string(),
                    message: err.to_string(),
                })
                .collect();
            return Err(ValidationError::new(format!("invalid {kind} payload"), issues));
        }
        Ok(())
    }

    /// Convert string query values to the scalar types the read schema
    /// declares for them.
    ///
    /// Values that do not parse are left as strings so that validation
    /// reports them.
    #[must_use]
    pub fn coerce_query(&self, query: &Document) -> Document {
        let properties = self
            .document(SchemaKind::Read)
            .or_else(|| self.document(SchemaKind::Query))
            .and_then(|doc| doc.get("properties"))
            .and_then(Value::as_object);
        query
            .iter()
            .map(|(key, value)| {
                let coerced = match (value, properties.and_then(|p| p.get(key))) {
                    (Value::String(raw), Some(property)) => coerce(raw, property),
                    _ => value.clone(),
                };
                (key.clone(), coerced)
            })
            .collect()
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.validators.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("EntitySchema").field("kinds", &kinds).finish()
    }
}

/// Anything that exposes an entity schema.
pub trait SchemaProvider {
    fn schema(&self) -> &EntitySchema;
}

fn without_required(record: &Value, keep: impl Fn(&str) -> bool) -> Value {
    let mut schema = record.clone();
    if let Some(object) = schema.as_object_mut() {
        let remaining: Vec<Value> = object
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter(|field| field.as_str().is_some_and(&keep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if remaining.is_empty() {
            object.remove("required");
        } else {
            object.insert("required".to_string(), Value::Array(remaining));
        }
    }
    schema
}

fn declared_types(property: &Value) -> Vec<&str> {
    match property.get("type") {
        Some(Value::String(kind)) => vec![kind.as_str()],
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn coerce(raw: &str, property: &Value) -> Value {
    let types = declared_types(property);
    if types.contains(&"string") {
        return Value::String(raw.to_string());
    }
    for kind in types {
        let parsed = match kind {
            "integer" => raw.parse::<i64>().ok().map(Value::from),
            "number" => raw.parse::<i64>().ok().map(Value::from).or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            }),
            "boolean" => raw.parse::<bool>().ok().map(Value::Bool),
            "null" if raw == "null" => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = parsed {
            return value;
        }
    }
    Value::String(raw.to_string())
}

/// Wrap a map of string values as a document.
#[must_use]
pub fn string_map(values: &HashMap<String, String>) -> Document {
    values
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<Map<String, Value>>()
}
