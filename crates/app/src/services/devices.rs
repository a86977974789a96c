//! Device control: commands and reads routed through device drivers.

use std::sync::Arc;

use serde_json::{Value, json};
use tendril_domain::command::Command;
use tendril_domain::device::Device;
use tendril_domain::error::{AppError, DriverError, ValidationError};
use tendril_domain::event::{DEVICE_COMMAND_SENT, DEVICE_VALUE_READ};

use crate::event_bus::EventBus;
use crate::module::Module;
use crate::ports::DriverRegistry;
use crate::route::{Method, RouteDescriptor, RouteResponse, handler};

/// Sends commands to, and reads values from, registered devices.
pub struct DeviceController {
    devices: Arc<Module<Device>>,
    commands: Arc<Module<Command>>,
    drivers: DriverRegistry,
    events: Arc<EventBus>,
}

impl DeviceController {
    pub fn new(
        devices: Arc<Module<Device>>,
        commands: Arc<Module<Command>>,
        drivers: DriverRegistry,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            devices,
            commands,
            drivers,
            events,
        }
    }

    /// Write `command` to the device with `device_id`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] when the device does not exist
    /// - [`AppError::Validation`] when the device is not an actuator
    /// - [`AppError::Driver`] when it has no address, no driver is
    ///   registered for its kind, or the write fails
    #[tracing::instrument(skip(self))]
    pub async fn send_command(&self, device_id: &str, command: &str) -> Result<(), AppError> {
        let device = self.devices.find_one(device_id).await?;
        if !device.role.can_actuate() {
            return Err(ValidationError::field(
                "/role",
                format!("device {device_id} is not an actuator"),
            )
            .into());
        }
        ensure_address(&device)?;
        let driver = self.drivers.get(&device.driver)?;
        driver.write(&device.address, command).await?;
        tracing::info!(device = device_id, command, "command sent");
        self.events.emit(
            DEVICE_COMMAND_SENT,
            json!({ "id": device_id, "command": command }),
        );
        Ok(())
    }

    /// Read the current value of the device with `device_id`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] when the device does not exist
    /// - [`AppError::Validation`] when the device is not a sensor
    /// - [`AppError::Driver`] when it has no address, no driver is
    ///   registered for its kind, or the read fails
    #[tracing::instrument(skip(self))]
    pub async fn read_value(&self, device_id: &str) -> Result<Value, AppError> {
        let device = self.devices.find_one(device_id).await?;
        if !device.role.can_sense() {
            return Err(ValidationError::field(
                "/role",
                format!("device {device_id} is not a sensor"),
            )
            .into());
        }
        ensure_address(&device)?;
        let driver = self.drivers.get(&device.driver)?;
        let value = driver.read(&device.address).await?;
        self.events.emit(
            DEVICE_VALUE_READ,
            json!({ "id": device_id, "value": value }),
        );
        Ok(value)
    }

    /// Resolve command `command_id` and send it to device `device_id`.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] when the command does not exist, otherwise
    /// anything [`Self::send_command`] fails with.
    #[tracing::instrument(skip(self))]
    pub async fn run_command(&self, device_id: &str, command_id: &str) -> Result<Command, AppError> {
        let command = self.commands.find_one(command_id).await?;
        self.send_command(device_id, &command.command).await?;
        Ok(command)
    }

    /// `POST /devices/{id}/command`, `GET /devices/{id}/value` and
    /// `POST /commands/{id}/run`.
    pub fn routes(self: &Arc<Self>) -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new(Method::Post, "/devices/{id}/command", {
                let this = Arc::clone(self);
                handler(move |req| {
                    let this = Arc::clone(&this);
                    async move {
                        let id = req.param("id")?;
                        let command = required_str(&req.body, "command")?;
                        this.send_command(id, command).await?;
                        Ok(RouteResponse::ok(json!({
                            "message": "command sent",
                            "id": id,
                            "command": command,
                        })))
                    }
                })
            })
            .summary("Send a command to a device")
            .description("Write a command to an actuator through its driver")
            .body_schema(Some(json!({
                "type": "object",
                "properties": { "command": { "type": "string", "minLength": 1 } },
                "required": ["command"]
            }))),
            RouteDescriptor::new(Method::Get, "/devices/{id}/value", {
                let this = Arc::clone(self);
                handler(move |req| {
                    let this = Arc::clone(&this);
                    async move {
                        let id = req.param("id")?;
                        let value = this.read_value(id).await?;
                        Ok(RouteResponse::ok(json!({ "id": id, "value": value })))
                    }
                })
            })
            .summary("Read a value from a device")
            .description("Read the current value of a sensor through its driver"),
            RouteDescriptor::new(Method::Post, "/commands/{id}/run", {
                let this = Arc::clone(self);
                handler(move |req| {
                    let this = Arc::clone(&this);
                    async move {
                        let command_id = req.param("id")?;
                        let device_id = required_str(&req.body, "deviceId")?;
                        let command = this.run_command(device_id, command_id).await?;
                        Ok(RouteResponse::ok(json!({
                            "message": "command sent",
                            "id": device_id,
                            "command": command.command,
                        })))
                    }
                })
            })
            .summary("Run a stored command on a device")
            .description("Resolve a command by id and send it to the given device")
            .body_schema(Some(json!({
                "type": "object",
                "properties": { "deviceId": { "type": "string", "minLength": 1 } },
                "required": ["deviceId"]
            }))),
        ]
    }
}

fn ensure_address(device: &Device) -> Result<(), DriverError> {
    if device.has_address() {
        Ok(())
    } else {
        Err(DriverError::InvalidAddress(format!(
            "device {} has no address",
            device.id
        )))
    }
}

fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, AppError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ValidationError::field(format!("/{field}"), "required string").into())
}
