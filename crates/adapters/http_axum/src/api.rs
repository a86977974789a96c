//! HTTP handlers.
//!
//! - [`descriptors`]: mounts application route descriptors
//! - [`openapi`]: `GET /openapi.json`
//! - [`sse`]: `GET /events/stream`
//! - [`mcp`]: `POST /mcp`, JSON-RPC 2.0 tool invocation

pub mod descriptors;
pub mod mcp;
pub mod openapi;
pub mod sse;
