//! # tendril-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Mount every [`RouteDescriptor`](tendril_app::route::RouteDescriptor) of an
//!   assembled [`Api`](tendril_app::registry::Api) as an axum route
//! - Translate [`AppError`](tendril_domain::error::AppError) into a status code
//!   and a `{code, message, details?}` JSON body
//! - Serve adapter-native endpoints: `GET /health`, `GET /openapi.json`,
//!   `GET /events/stream` (SSE) and `POST /mcp` (JSON-RPC tool invocation)
//!
//! ## Dependency rule
//! Depends on `tendril-app` and `tendril-domain`. Never leaks axum types into
//! the application layer.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
