//! # tendril-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - [`Repository`](ports::Repository) / [`Database`](ports::Database), document persistence per collection
//!   - [`Driver`](ports::Driver), read/write a value at a device address
//!   - [`SettingsStore`](ports::SettingsStore), key-value settings and manifest
//! - Provide the generic entity [`Module`](module::Module): schema validation,
//!   persistence through a repository, lifecycle events
//! - Provide the in-process [`EventBus`](event_bus::EventBus) with wildcard listeners
//! - Generate CRUD routes ([`RouteGenerator`](crud::RouteGenerator)), the
//!   OpenAPI document ([`DocGenerator`](docs::DocGenerator)) and callable
//!   tools ([`ToolGenerator`](tools::ToolGenerator)) from route descriptors
//! - Evaluate trigger rules against ingested readings
//!   ([`TriggerEngine`](trigger_engine::TriggerEngine))
//! - Wire the device, command, trigger, reading and settings features
//!   ([`features::install`])
//!
//! ## Dependency rule
//! Depends on `tendril-domain` only. Never imports adapter crates; adapters
//! depend on *this* crate, not the reverse.

pub mod crud;
pub mod deps;
pub mod docs;
pub mod event_bus;
pub mod features;
pub mod module;
pub mod ports;
pub mod registry;
pub mod route;
pub mod schema;
pub mod services;
pub mod subscribers;
pub mod tools;
pub mod trigger_engine;

#[cfg(test)]
pub(crate) mod testing;
