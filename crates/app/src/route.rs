//! Route descriptors: transport-neutral descriptions of endpoints.
//!
//! A descriptor carries its path, method, documentation, declared input
//! schemas and an async handler. The HTTP adapter mounts descriptors, the
//! [`DocGenerator`](crate::docs::DocGenerator) documents them and the
//! [`ToolGenerator`](crate::tools::ToolGenerator) turns them into tools.
//!
//! Paths use `{name}` for parameter segments, e.g. `/devices/{id}`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Value, json};
use tendril_domain::error::{AppError, ValidationError};

use crate::ports::Document;

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Lower-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// Whether requests of this method carry a body.
    #[must_use]
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared shapes of a route's inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchemas {
    pub params: Option<Value>,
    pub query: Option<Value>,
    pub body: Option<Value>,
}

/// Transport-neutral request handed to a route handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub params: HashMap<String, String>,
    /// Query values; strings when they come from a URL.
    pub query: Document,
    pub body: Value,
    pub headers: HashMap<String, String>,
}

impl Default for RouteRequest {
    fn default() -> Self {
        Self {
            params: HashMap::new(),
            query: Document::new(),
            body: Value::Object(Document::new()),
            headers: HashMap::new(),
        }
    }
}

impl RouteRequest {
    /// Path parameter `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when the parameter is missing.
    pub fn param(&self, name: &str) -> Result<&str, AppError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::field(format!("/params/{name}"), "missing path parameter").into())
    }

    /// Query value `name` as text.
    #[must_use]
    pub fn query_str(&self, name: &str) -> Option<String> {
        match self.query.get(name)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub status: u16,
    pub body: Value,
}

impl RouteResponse {
    /// `200` with `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// `200` with `value` serialized as the body.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when `value` does not serialize.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(Self::ok)
            .map_err(|err| AppError::internal(format!("response serialization failed: {err}")))
    }
}

/// Async route handler.
pub type Handler =
    Arc<dyn Fn(RouteRequest) -> BoxFuture<'static, Result<RouteResponse, AppError>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RouteResponse, AppError>> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}

/// One endpoint.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub path: String,
    pub method: Method,
    pub summary: String,
    pub description: String,
    pub input_schemas: InputSchemas,
    pub handler: Handler,
}

impl RouteDescriptor {
    /// Describe `method path`, served by `handler`.
    ///
    /// Routes with path parameters get a `params` schema requiring each of
    /// them as a string.
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        let path = path.into();
        let names = path_params(&path);
        let params = (!names.is_empty()).then(|| params_schema(&names));
        Self {
            path,
            method,
            summary: String::new(),
            description: String::new(),
            input_schemas: InputSchemas {
                params,
                query: None,
                body: None,
            },
            handler,
        }
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn query_schema(mut self, schema: Option<Value>) -> Self {
        self.input_schemas.query = schema;
        self
    }

    #[must_use]
    pub fn body_schema(mut self, schema: Option<Value>) -> Self {
        self.input_schemas.body = schema;
        self
    }

    /// Names of the parameter segments of the path, in order.
    #[must_use]
    pub fn path_params(&self) -> Vec<String> {
        path_params(&self.path)
    }

    #[must_use]
    pub fn has_path_params(&self) -> bool {
        !self.path_params().is_empty()
    }

    /// Run the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler fails with.
    pub async fn call(&self, request: RouteRequest) -> Result<RouteResponse, AppError> {
        (self.handler)(request).await
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("summary", &self.summary)
            .field("input_schemas", &self.input_schemas)
            .finish_non_exhaustive()
    }
}

/// Parameter names of `path`. Accepts both `{id}` and `:id` segments.
#[must_use]
pub fn path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .or_else(|| segment.strip_prefix(':'))
        })
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Object schema requiring each of `names` as a string.
#[must_use]
pub fn params_schema(names: &[String]) -> Value {
    let properties: Document = names
        .iter()
        .map(|name| (name.clone(), json!({ "type": "string" })))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        handler(|_| async { Ok(RouteResponse::ok(Value::Null)) })
    }

    #[test]
    fn should_extract_braced_and_colon_params() {
        assert_eq!(path_params("/devices/{id}/command"), vec!["id"]);
        assert_eq!(path_params("/a/:x/b/{y}"), vec!["x", "y"]);
        assert!(path_params("/devices").is_empty());
    }

    #[test]
    fn should_declare_params_schema_for_parameterised_path() {
        let route = RouteDescriptor::new(Method::Get, "/devices/{id}", noop());
        let params = route.input_schemas.params.unwrap();
        assert_eq!(params["required"], json!(["id"]));
        assert_eq!(params["properties"]["id"]["type"], "string");
    }

    #[test]
    fn should_not_declare_params_schema_for_collection_path() {
        let route = RouteDescriptor::new(Method::Get, "/devices", noop());
        assert!(route.input_schemas.params.is_none());
        assert!(!route.has_path_params());
    }

    #[test]
    fn should_fail_with_validation_error_when_param_is_missing() {
        let request = RouteRequest::default();
        let err = request.param("id").unwrap_err();
        assert_eq!(err.status(), 422);
    }

    #[test]
    fn should_read_query_values_as_text() {
        let mut request = RouteRequest::default();
        request.query.insert("a".to_string(), json!("x"));
        request.query.insert("b".to_string(), json!(3));
        assert_eq!(request.query_str("a").as_deref(), Some("x"));
        assert_eq!(request.query_str("b").as_deref(), Some("3"));
        assert_eq!(request.query_str("c"), None);
    }

    #[tokio::test]
    async fn should_call_handler() {
        let route = RouteDescriptor::new(
            Method::Post,
            "/echo",
            handler(|req| async move { Ok(RouteResponse::ok(req.body)) }),
        );
        let request = RouteRequest {
            body: json!({"x": 1}),
            ..RouteRequest::default()
        };
        let response = route.call(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"x": 1}));
    }
}
