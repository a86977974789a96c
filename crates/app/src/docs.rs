//! OpenAPI 3.0 document generation from route descriptors.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::route::RouteDescriptor;
use crate::schema::{EntitySchema, SchemaKind};

/// Collects component schemas and renders the API document.
#[derive(Debug, Clone)]
pub struct DocGenerator {
    title: String,
    version: String,
    components: BTreeMap<String, Value>,
}

impl DocGenerator {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            components: BTreeMap::new(),
        }
    }

    /// Keep the schema of module `name`: its read schema, else its create
    /// schema. Modules declaring neither get no component.
    pub fn register_module(&mut self, name: &str, schema: &EntitySchema) {
        let document = schema
            .document(SchemaKind::Read)
            .or_else(|| schema.document(SchemaKind::Create));
        if let Some(document) = document {
            self.components.insert(name.to_string(), document.clone());
        }
    }

    /// Render an OpenAPI 3.0 document with one operation per route.
    #[must_use]
    pub fn generate(&self, routes: &[RouteDescriptor]) -> Value {
        let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        for route in routes {
            paths
                .entry(openapi_path(&route.path))
                .or_default()
                .insert(route.method.as_str().to_string(), operation(route));
        }

        let mut schemas: Map<String, Value> = self
            .components
            .iter()
            .map(|(name, schema)| (name.clone(), schema.clone()))
            .collect();
        schemas.insert("Error".to_string(), error_schema());

        json!({
            "openapi": "3.0.3",
            "info": { "title": self.title, "version": self.version },
            "paths": paths,
            "components": { "schemas": schemas },
        })
    }
}

fn open_object() -> Value {
    json!({ "type": "object", "additionalProperties": true })
}

fn error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": { "type": "string" },
            "message": { "type": "string" },
            "details": {}
        },
        "required": ["code", "message"]
    })
}

/// `:id` segments become `{id}`.
fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn operation(route: &RouteDescriptor) -> Value {
    let mut parameters: Vec<Value> = route
        .path_params()
        .into_iter()
        .map(|name| {
            let schema = route
                .input_schemas
                .params
                .as_ref()
                .and_then(|params| params.pointer(&format!("/properties/{name}")))
                .cloned()
                .unwrap_or_else(|| json!({ "type": "string" }));
            json!({ "name": name, "in": "path", "required": true, "schema": schema })
        })
        .collect();
    parameters.push(json!({
        "name": "query",
        "in": "query",
        "required": false,
        "style": "form",
        "explode": true,
        "schema": route.input_schemas.query.clone().unwrap_or_else(open_object),
    }));

    let tag = route
        .path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    let summary = if route.summary.is_empty() {
        format!("{} {}", route.method.as_str().to_uppercase(), route.path)
    } else {
        route.summary.clone()
    };

    let mut operation = json!({
        "summary": summary,
        "tags": [tag],
        "parameters": parameters,
        "responses": {
            "200": {
                "description": "Successful response",
                "content": { "application/json": { "schema": {} } }
            },
            "default": {
                "description": "Error",
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Error" }
                    }
                }
            }
        }
    });
    if !route.description.is_empty() {
        operation["description"] = Value::String(route.description.clone());
    }
    if route.method.has_body() {
        operation["requestBody"] = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": route.input_schemas.body.clone().unwrap_or_else(open_object)
                }
            }
        });
    }
    operation
}
