//! `POST /mcp`: JSON-RPC 2.0 access to the generated tools.
//!
//! Supported methods are `initialize`, `ping`, `tools/list` and
//! `tools/call`. Notifications (requests without an id) get `202 Accepted`
//! and no body.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use tendril_app::registry::Api;
use tendril_domain::error::AppError;

use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    /// Absent for notifications. An explicit `null` is kept as `Some(Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Axum handler for `POST /mcp`.
pub async fn endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let request: McpRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "unparseable JSON-RPC request");
            return Json(McpResponse::error(None, PARSE_ERROR, "Parse error")).into_response();
        }
    };
    if request.id.is_none() {
        tracing::debug!(method = %request.method, "JSON-RPC notification");
        return StatusCode::ACCEPTED.into_response();
    }
    Json(handle(&state.api, request).await).into_response()
}

/// Answer one JSON-RPC request against `api`.
#[tracing::instrument(skip(api, request), fields(method = %request.method))]
pub async fn handle(api: &Api, request: McpRequest) -> McpResponse {
    if request.jsonrpc != "2.0" {
        return McpResponse::error(request.id, INVALID_REQUEST, "Invalid Request");
    }
    match request.method.as_str() {
        "initialize" => initialize(api, request.id),
        "ping" => McpResponse::success(request.id, json!({})),
        "tools/list" => list_tools(api, request.id),
        "tools/call" => call_tool(api, request.id, request.params).await,
        _ => McpResponse::error(request.id, METHOD_NOT_FOUND, "Method not found"),
    }
}

fn initialize(api: &Api, id: Option<Value>) -> McpResponse {
    let info = &api.openapi()["info"];
    McpResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": info["title"].as_str().unwrap_or("tendril"),
                "version": info["version"].as_str().unwrap_or_default(),
            },
        }),
    )
}

fn list_tools(api: &Api, id: Option<Value>) -> McpResponse {
    let tools: Vec<Value> = api
        .tools()
        .listing()
        .into_iter()
        .map(|listing| {
            json!({
                "name": listing.name,
                "description": listing.description,
                "inputSchema": listing
                    .input_schema
                    .unwrap_or_else(|| json!({ "type": "object" })),
            })
        })
        .collect();
    McpResponse::success(id, json!({ "tools": tools }))
}

async fn call_tool(api: &Api, id: Option<Value>, params: Value) -> McpResponse {
    let params: CallParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return McpResponse::error(id, INVALID_PARAMS, format!("Invalid params: {err}")),
    };
    let arguments = if params.arguments.is_null() {
        json!({})
    } else {
        params.arguments
    };
    match api.tools().invoke(&params.name, arguments).await {
        Ok(output) => {
            let is_error = output.status >= 400;
            let text = serde_json::to_string(&output.data).unwrap_or_default();
            McpResponse::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": output,
                    "isError": is_error,
                }),
            )
        }
        Err(AppError::NotFound(_)) => {
            McpResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", params.name))
        }
        Err(err) => McpResponse::error(id, INVALID_PARAMS, err.to_string()),
    }
}
