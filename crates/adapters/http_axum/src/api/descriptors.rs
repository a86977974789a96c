//! Mounts application [`RouteDescriptor`]s as axum routes.
//!
//! Each descriptor becomes one method handler. Path parameters, query
//! values, headers and the JSON body are gathered into a
//! [`RouteRequest`]; the descriptor's [`RouteResponse`] is answered as JSON
//! with its status.

use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, RawPathParams};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use serde_json::Value;

use tendril_app::route::{Method, RouteDescriptor, RouteRequest};
use tendril_app::schema::string_map;
use tendril_domain::error::{AppError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// One axum method router per distinct path, keyed by the axum path.
#[must_use]
pub fn method_routers(routes: &[RouteDescriptor]) -> BTreeMap<String, MethodRouter<AppState>> {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for route in routes {
        let descriptor = route.clone();
        let endpoint = move |params: RawPathParams,
                             Query(query): Query<HashMap<String, String>>,
                             headers: HeaderMap,
                             body: Bytes| {
            let route = descriptor.clone();
            let params = params
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            async move { serve(route, params, query, headers, body).await }
        };
        let path = axum_path(&route.path);
        let entry = by_path.remove(&path).unwrap_or_else(MethodRouter::new);
        by_path.insert(path, entry.on(method_filter(route.method), endpoint));
        tracing::debug!(method = %route.method, path = %route.path, "route mounted");
    }
    by_path
}

async fn serve(
    route: RouteDescriptor,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match body_value(&body) {
        Ok(body) => RouteRequest {
            params,
            query: string_map(&query),
            body,
            headers: header_map(&headers),
        },
        Err(err) => return ApiError(err).into_response(),
    };
    match route.call(request).await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            (status, Json(response.body)).into_response()
        }
        Err(err) => ApiError(err).into_response(),
    }
}

/// An empty body reads as `{}`.
fn body_value(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|err| ValidationError::field("/body", format!("invalid JSON: {err}")).into())
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Patch => MethodFilter::PATCH,
        Method::Delete => MethodFilter::DELETE,
    }
}

/// `:id` segments become `{id}`.
fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
