//! Axum router assembly.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Mounts every route descriptor of the assembled API next to the
/// adapter-native endpoints. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(api::openapi::document))
        .route("/events/stream", get(api::sse::stream))
        .route("/mcp", post(api::mcp::endpoint));

    api::descriptors::method_routers(state.api.routes())
        .into_iter()
        .fold(router, |router, (path, method_router)| {
            router.route(&path, method_router)
        })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tendril_adapter_virtual::{MemoryDatabase, MemorySettingsStore, VirtualDriver};
    use tendril_app::deps::Dependencies;
    use tendril_app::features;
    use tendril_app::ports::DriverRegistry;
    use tendril_app::registry::Registry;
    use tendril_app::trigger_engine::TriggerScope;
    use tower::ServiceExt;

    fn app() -> Router {
        let deps = Dependencies::new(
            Arc::new(MemoryDatabase::new()),
            DriverRegistry::new().with(Arc::new(VirtualDriver::new())),
            Arc::new(MemorySettingsStore::new()),
        );
        let mut registry = Registry::new("tendril", "0.1.0", Arc::clone(&deps.events));
        features::install(&mut registry, &deps, TriggerScope::Device).unwrap();
        build(AppState::new(registry.finish()))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    fn device() -> Value {
        json!({ "id": "d1", "role": "actuator", "driver": "virtual", "address": { "pin": 4 } })
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (status, body) = send(app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));
    }

    #[tokio::test]
    async fn should_serve_openapi_document_when_requested() {
        let (status, body) = send(app(), "GET", "/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["openapi"], "3.0.3");
        assert!(body["paths"]["/devices/{id}"]["get"].is_object());
        assert!(body["paths"]["/readings/series"]["get"].is_object());
    }

    #[tokio::test]
    async fn should_create_and_fetch_device_when_payload_valid() {
        let app = app();
        let (status, created) = send(app.clone(), "POST", "/devices", Some(device())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], "d1");

        let (status, fetched) = send(app, "GET", "/devices/d1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["driver"], "virtual");
    }

    #[tokio::test]
    async fn should_return_422_when_payload_invalid() {
        let (status, body) =
            send(app(), "POST", "/devices", Some(json!({ "role": "toaster" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "validation_error");
        assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));
    }

    #[tokio::test]
    async fn should_return_422_when_body_not_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/devices")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn should_return_404_with_entity_code_when_device_missing() {
        let (status, body) = send(app(), "GET", "/devices/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "devices.not_found");
    }

    #[tokio::test]
    async fn should_filter_list_when_query_given() {
        let app = app();
        send(app.clone(), "POST", "/devices", Some(device())).await;
        let mut other = device();
        other["id"] = json!("d2");
        other["driver"] = json!("mqtt");
        send(app.clone(), "POST", "/devices", Some(other)).await;

        let (status, body) = send(app, "GET", "/devices?driver=mqtt", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["id"], "d2");
    }

    #[tokio::test]
    async fn should_send_command_through_driver_when_device_actuates() {
        let app = app();
        send(app.clone(), "POST", "/devices", Some(device())).await;
        let (status, _) = send(
            app,
            "POST",
            "/devices/d1/command",
            Some(json!({ "command": "on" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_list_tools_when_mcp_tools_list_called() {
        let (status, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tools = body["result"]["tools"].as_array().unwrap();
        assert_eq!(tools[0]["name"], "drivers.list");
        assert!(tools.iter().any(|tool| tool["name"] == "rest.get.devices_id"));
        assert!(tools.iter().all(|tool| tool["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn should_call_tool_when_mcp_tools_call_called() {
        let app = app();
        send(app.clone(), "POST", "/devices", Some(device())).await;
        let (_, body) = send(
            app,
            "POST",
            "/mcp",
            Some(json!({
                "jsonrpc": "2.0",
                "id": "a",
                "method": "tools/call",
                "params": { "name": "rest.get.devices_id", "arguments": { "params": { "id": "d1" } } },
            })),
        )
        .await;
        assert_eq!(body["id"], "a");
        assert_eq!(body["result"]["isError"], false);
        assert_eq!(body["result"]["structuredContent"]["status"], 200);
        assert_eq!(body["result"]["structuredContent"]["data"]["id"], "d1");
    }

    #[tokio::test]
    async fn should_flag_error_when_tool_fails() {
        let (_, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": { "name": "rest.get.devices_id", "arguments": { "params": { "id": "zz" } } },
            })),
        )
        .await;
        assert_eq!(body["result"]["isError"], true);
        assert_eq!(body["result"]["structuredContent"]["status"], 404);
    }

    #[tokio::test]
    async fn should_answer_invalid_params_when_tool_unknown() {
        let (_, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "nope" },
            })),
        )
        .await;
        assert_eq!(body["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn should_answer_method_not_found_when_method_unknown() {
        let (_, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" })),
        )
        .await;
        assert_eq!(body["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn should_answer_parse_error_when_mcp_body_garbage() {
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(Body::from("]["))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn should_accept_without_body_when_notification_sent() {
        let (status, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn should_answer_request_when_id_is_explicit_null() {
        let (status, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({ "jsonrpc": "2.0", "id": null, "method": "ping" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn should_describe_server_when_initialized() {
        let (_, body) = send(
            app(),
            "POST",
            "/mcp",
            Some(json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} })),
        )
        .await;
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["serverInfo"]["name"], "tendril");
    }
}
