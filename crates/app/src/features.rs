//! Feature wiring: the device, command, trigger, reading and settings
//! modules, their services and the trigger engine.

use std::sync::Arc;

use serde_json::{Value, json};
use tendril_domain::command::{self, Command};
use tendril_domain::device::{self, Device};
use tendril_domain::error::AppError;
use tendril_domain::reading::{self, Reading};
use tendril_domain::record::Record;
use tendril_domain::trigger::{self, Trigger};

use crate::deps::Dependencies;
use crate::module::Module;
use crate::registry::Registry;
use crate::schema::EntitySchema;
use crate::services::{DeviceController, ReadingsService, SettingsService};
use crate::subscribers;
use crate::tools::{ToolDescriptor, ToolOutput};
use crate::trigger_engine::{TriggerEngine, TriggerScope};

/// Handles on everything [`install`] built.
pub struct Features {
    pub devices: Arc<Module<Device>>,
    pub commands: Arc<Module<Command>>,
    pub triggers: Arc<Module<Trigger>>,
    pub readings: Arc<Module<Reading>>,
    pub controller: Arc<DeviceController>,
    pub engine: Arc<TriggerEngine>,
}

/// Build a module for `name` whose four validators derive from `schema`.
///
/// # Errors
///
/// Returns [`AppError::Internal`] when `schema` is not a valid JSON schema.
pub fn module<T: Record>(deps: &Dependencies, name: &str, schema: Value) -> Result<Arc<Module<T>>, AppError> {
    Ok(Arc::new(Module::new(
        name,
        EntitySchema::from_record(schema)?,
        deps.database.repository(name),
        Arc::clone(&deps.events),
    )))
}

/// Register every built-in feature on `registry` and start listening for
/// readings.
///
/// # Errors
///
/// Propagates schema compilation, route registration and listener
/// registration failures.
pub fn install(
    registry: &mut Registry,
    deps: &Dependencies,
    scope: TriggerScope,
) -> Result<Features, AppError> {
    let devices = module::<Device>(deps, device::COLLECTION, Device::json_schema())?;
    let commands = module::<Command>(deps, command::COLLECTION, Command::json_schema())?;
    let triggers = module::<Trigger>(deps, trigger::COLLECTION, Trigger::json_schema())?;
    let readings = module::<Reading>(deps, reading::COLLECTION, Reading::json_schema())?;

    let controller = Arc::new(DeviceController::new(
        Arc::clone(&devices),
        Arc::clone(&commands),
        deps.drivers.clone(),
        Arc::clone(&deps.events),
    ));
    let readings_service = Arc::new(ReadingsService::new(Arc::clone(&readings)));
    let settings = Arc::new(SettingsService::new(
        Arc::clone(&deps.settings),
        Arc::clone(&deps.events),
    ));

    registry.register_module(&devices)?;
    registry.register_module(&commands)?;
    registry.register_module(&triggers)?;
    registry.register_module(&readings)?;
    registry.register_routes(controller.routes())?;
    registry.register_routes(readings_service.routes())?;
    registry.register_routes(settings.routes())?;

    let kinds: Vec<String> = deps.drivers.kinds().into_iter().map(String::from).collect();
    registry.register_tool(ToolDescriptor::manual(
        "drivers.list",
        "List the registered device driver kinds",
        move |_| {
            let kinds = kinds.clone();
            async move {
                ToolOutput {
                    status: 200,
                    data: json!(kinds),
                }
            }
        },
    ));

    subscribers::log_events(&deps.events)?;
    let engine = Arc::new(TriggerEngine::new(
        Arc::clone(&triggers),
        Arc::clone(&controller),
        scope,
    ));
    engine.attach(&deps.events)?;

    Ok(Features {
        devices,
        commands,
        triggers,
        readings,
        controller,
        engine,
    })
}
