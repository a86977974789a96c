//! Record identifiers.
//!
//! Identifiers are opaque strings. Repositories assign a UUID v4 on create
//! when the payload carries none; callers may also supply their own.

use serde_json::Value;

/// Name of the identifier field on every record.
pub const ID_FIELD: &str = "id";

/// Generate a fresh identifier.
#[must_use]
pub fn generate() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether `id` has the shape of a generated identifier.
#[must_use]
pub fn is_generated(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Read a caller-supplied identifier out of a JSON value.
///
/// Strings are taken as-is, numbers are stringified, and `null` or any other
/// shape counts as "no identifier".
#[must_use]
pub fn from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
