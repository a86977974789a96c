//! Tool generation: one callable tool per route descriptor.
//!
//! A tool takes `{params?, query?, body?, headers?}`, runs the route handler
//! on a synthetic request and answers `{status, data}`. Handler failures are
//! folded into the output as `{status, data: {code, message, details}}`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tendril_domain::error::{AppError, NotFoundError};

use crate::route::{Method, RouteDescriptor, RouteRequest};

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub status: u16,
    pub data: Value,
}

impl From<Result<crate::route::RouteResponse, AppError>> for ToolOutput {
    fn from(result: Result<crate::route::RouteResponse, AppError>) -> Self {
        match result {
            Ok(response) => Self {
                status: response.status,
                data: response.body,
            },
            Err(err) => Self {
                status: err.status(),
                data: serde_json::to_value(err.to_body()).unwrap_or(Value::Null),
            },
        }
    }
}

/// Async tool body.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ToolOutput> + Send + Sync>;

/// One callable tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// `None` for manually registered tools that declare no shape.
    pub input_schema: Option<Value>,
    pub handler: ToolHandler,
}

impl ToolDescriptor {
    /// A tool not backed by any route. It carries no input schema.
    pub fn manual<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
            handler: Arc::new(move |input| f(input).boxed()),
        }
    }

    /// Derive the tool for `route`.
    #[must_use]
    pub fn from_route(route: &RouteDescriptor) -> Self {
        let name = tool_name(route.method, &route.path);
        let description = if !route.summary.is_empty() {
            route.summary.clone()
        } else if !route.description.is_empty() {
            route.description.clone()
        } else {
            format!("Invoke {} {}", route.method.as_str().to_uppercase(), route.path)
        };
        let input_schema = Some(input_schema(route));
        let route = route.clone();
        let tool_label = name.clone();
        let handler: ToolHandler = Arc::new(move |input| {
            let route = route.clone();
            let tool_label = tool_label.clone();
            async move {
                let result = route.call(request_from_input(&input)).await;
                if let Err(err) = &result {
                    tracing::debug!(tool = %tool_label, status = err.status(), error = %err, "tool call failed");
                }
                ToolOutput::from(result)
            }
            .boxed()
        });
        Self {
            name,
            description,
            input_schema,
            handler,
        }
    }

    pub async fn invoke(&self, input: Value) -> ToolOutput {
        (self.handler)(input).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Wire shape of a tool in a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// The set of tools: manual ones first, then one per route.
#[derive(Debug, Clone, Default)]
pub struct ToolGenerator {
    tools: Vec<ToolDescriptor>,
}

impl ToolGenerator {
    /// Build the tools for `routes`, after the `manual` ones.
    #[must_use]
    pub fn build(manual: Vec<ToolDescriptor>, routes: &[RouteDescriptor]) -> Self {
        let mut tools = manual;
        tools.extend(routes.iter().map(ToolDescriptor::from_route));
        for tool in &tools {
            tracing::debug!(tool = %tool.name, "tool registered");
        }
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    #[must_use]
    pub fn listing(&self) -> Vec<ToolListing> {
        self.tools
            .iter()
            .map(|tool| ToolListing {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect()
    }

    /// Invoke tool `name` with `input`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no tool has that name. Failures
    /// of the tool itself are part of the [`ToolOutput`].
    pub async fn invoke(&self, name: &str, input: Value) -> Result<ToolOutput, AppError> {
        let tool = self
            .get(name)
            .ok_or_else(|| NotFoundError::new("tools", name))?;
        Ok(tool.invoke(input).await)
    }
}

/// Tool-name fragment for `path`: leading slash stripped, `/` to `_`,
/// `:`/`{`/`}` removed, anything else outside `[A-Za-z0-9_-]` to `_`.
#[must_use]
pub fn sanitize(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed
        .chars()
        .filter(|c| !matches!(c, ':' | '{' | '}'))
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `rest.<method>.<sanitized path>`
#[must_use]
pub fn tool_name(method: Method, path: &str) -> String {
    let sanitized = sanitize(path);
    ["rest", method.as_str(), sanitized.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn open_object() -> Value {
    json!({ "type": "object", "additionalProperties": true })
}

fn input_schema(route: &RouteDescriptor) -> Value {
    let has_params = route.has_path_params();
    let mut required = Vec::new();
    if has_params {
        required.push("params");
    }
    if route.method.has_body() {
        required.push("body");
    }
    if route.method == Method::Get && !has_params {
        required.push("query");
    }

    let declared = &route.input_schemas;
    let mut schema = json!({
        "type": "object",
        "properties": {
            "params": declared.params.clone().unwrap_or_else(open_object),
            "query": declared.query.clone().unwrap_or_else(open_object),
            "body": declared.body.clone().unwrap_or_else(open_object),
            "headers": open_object(),
        },
        "additionalProperties": false,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_entries(value: Option<&Value>) -> HashMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), text(v))).collect())
        .unwrap_or_default()
}

fn request_from_input(input: &Value) -> RouteRequest {
    RouteRequest {
        params: string_entries(input.get("params")),
        query: input
            .get("query")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        body: match input.get("body") {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(body) => body.clone(),
        },
        headers: string_entries(input.get("headers")),
    }
}
