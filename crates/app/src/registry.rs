//! Registry: collects modules, extra routes and manual tools, then freezes
//! them into an [`Api`].
//!
//! Tools and the OpenAPI document are built once, in [`Registry::finish`],
//! from the full route list.

use std::sync::Arc;

use serde_json::Value;
use tendril_domain::error::AppError;
use tendril_domain::record::Record;

use crate::crud::RouteGenerator;
use crate::docs::DocGenerator;
use crate::event_bus::EventBus;
use crate::module::Module;
use crate::route::RouteDescriptor;
use crate::schema::SchemaProvider;
use crate::tools::{ToolDescriptor, ToolGenerator};

pub struct Registry {
    routes: Vec<RouteDescriptor>,
    tools: Vec<ToolDescriptor>,
    docs: DocGenerator,
    events: Arc<EventBus>,
}

impl Registry {
    pub fn new(title: impl Into<String>, version: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            routes: Vec::new(),
            tools: Vec::new(),
            docs: DocGenerator::new(title, version),
            events,
        }
    }

    /// Register the CRUD routes and the schema of `module`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when one of its routes is already
    /// registered.
    pub fn register_module<T: Record>(&mut self, module: &Arc<Module<T>>) -> Result<(), AppError> {
        self.register_routes(RouteGenerator::generate(module))?;
        self.docs.register_module(module.name(), module.schema());
        tracing::info!(module = module.name(), "module registered");
        Ok(())
    }

    /// Register additional routes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when a `(method, path)` pair is already
    /// registered; nothing is registered in that case.
    pub fn register_routes(&mut self, routes: Vec<RouteDescriptor>) -> Result<(), AppError> {
        for (index, route) in routes.iter().enumerate() {
            let taken = self
                .routes
                .iter()
                .chain(&routes[..index])
                .any(|r| r.method == route.method && r.path == route.path);
            if taken {
                return Err(AppError::internal(format!(
                    "route {} {} registered twice",
                    route.method.as_str().to_uppercase(),
                    route.path
                )));
            }
        }
        for route in &routes {
            tracing::debug!(method = %route.method, path = %route.path, "route registered");
        }
        self.routes.extend(routes);
        Ok(())
    }

    /// Register a tool that is not backed by a route.
    pub fn register_tool(&mut self, tool: ToolDescriptor) {
        self.tools.push(tool);
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Build the OpenAPI document and the tools from everything registered.
    #[must_use]
    pub fn finish(self) -> Api {
        let openapi = self.docs.generate(&self.routes);
        let tools = ToolGenerator::build(self.tools, &self.routes);
        tracing::info!(
            routes = self.routes.len(),
            tools = tools.tools().len(),
            "api assembled"
        );
        Api {
            routes: self.routes,
            openapi,
            tools,
            events: self.events,
        }
    }
}

/// The assembled surface handed to transport adapters.
pub struct Api {
    routes: Vec<RouteDescriptor>,
    openapi: Value,
    tools: ToolGenerator,
    events: Arc<EventBus>,
}

impl Api {
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    #[must_use]
    pub fn openapi(&self) -> &Value {
        &self.openapi
    }

    #[must_use]
    pub fn tools(&self) -> &ToolGenerator {
        &self.tools
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Method, RouteResponse, handler};
    use crate::testing::widget_module;

    fn ping() -> RouteDescriptor {
        RouteDescriptor::new(
            Method::Get,
            "/ping",
            handler(|_| async { Ok(RouteResponse::ok(Value::from("pong"))) }),
        )
    }

    #[test]
    fn should_register_module_routes_docs_and_tools() {
        let (module, _) = widget_module();
        let mut registry = Registry::new("t", "1", Arc::new(EventBus::default()));
        registry.register_module(&module).unwrap();
        registry.register_routes(vec![ping()]).unwrap();

        let api = registry.finish();

        assert_eq!(api.routes().len(), 6);
        assert!(api.openapi()["paths"]["/ping"]["get"].is_object());
        assert!(api.openapi()["components"]["schemas"]["widgets"].is_object());
        assert!(api.tools().get("rest.get.ping").is_some());
        assert!(api.tools().get("rest.delete.widgets_id").is_some());
    }

    #[test]
    fn should_reject_duplicate_routes() {
        let mut registry = Registry::new("t", "1", Arc::new(EventBus::default()));
        registry.register_routes(vec![ping()]).unwrap();
        assert!(registry.register_routes(vec![ping()]).is_err());
        assert!(registry.register_routes(vec![
            RouteDescriptor::new(Method::Post, "/a", handler(|_| async { Ok(RouteResponse::ok(Value::Null)) })),
            RouteDescriptor::new(Method::Post, "/a", handler(|_| async { Ok(RouteResponse::ok(Value::Null)) })),
        ])
        .is_err());
        assert_eq!(registry.routes().len(), 1);
    }

    #[test]
    fn should_list_manual_tools_before_route_tools() {
        let mut registry = Registry::new("t", "1", Arc::new(EventBus::default()));
        registry.register_routes(vec![ping()]).unwrap();
        registry.register_tool(ToolDescriptor::manual("noop", "Do nothing", |_| async {
            crate::tools::ToolOutput {
                status: 200,
                data: Value::Null,
            }
        }));
        let api = registry.finish();
        let names: Vec<&str> = api.tools().tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["noop", "rest.get.ping"]);
    }
}
