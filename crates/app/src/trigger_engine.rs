//! Trigger engine: reacts to ingested readings by evaluating trigger rules.
//!
//! The engine listens to `readings.created`. For each event it loads the
//! candidate triggers, evaluates every `value` trigger against the *first*
//! reading of the batch and, when the comparator holds, runs the trigger's
//! command on the trigger's device. `cron` triggers are left to a scheduler
//! and never fire here.
//!
//! Failures are logged and swallowed: a failing trigger never fails the
//! request that stored the reading.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tendril_domain::error::AppError;
use tendril_domain::event::{Event, READINGS_CREATED};
use tendril_domain::reading::Reading;
use tendril_domain::trigger::{Trigger, TriggerKind};

use crate::event_bus::EventBus;
use crate::module::Module;
use crate::ports::Document;
use crate::services::DeviceController;

/// How candidate triggers are selected for an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerScope {
    /// Triggers whose `deviceId` is the device of the first reading.
    #[default]
    Device,
    /// Triggers whose `event` is the event name.
    Event,
}

impl std::str::FromStr for TriggerScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(Self::Device),
            "event" => Ok(Self::Event),
            other => Err(format!("unknown trigger scope {other:?}")),
        }
    }
}

/// Reactive trigger engine.
pub struct TriggerEngine {
    triggers: Arc<Module<Trigger>>,
    controller: Arc<DeviceController>,
    scope: TriggerScope,
}

impl TriggerEngine {
    pub fn new(
        triggers: Arc<Module<Trigger>>,
        controller: Arc<DeviceController>,
        scope: TriggerScope,
    ) -> Self {
        Self {
            triggers,
            controller,
            scope,
        }
    }

    /// Listen to `readings.created` on `bus`.
    ///
    /// # Errors
    ///
    /// Propagates the registration error of the bus.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Result<(), AppError> {
        let engine = Arc::clone(self);
        bus.on(READINGS_CREATED, move |event| {
            let engine = Arc::clone(&engine);
            async move {
                engine.process_event(&event).await?;
                Ok(())
            }
        })?;
        tracing::info!(scope = ?self.scope, "trigger engine attached");
        Ok(())
    }

    /// Evaluate the triggers concerned by `event` and run the commands of
    /// those that match. Returns the ids of the triggers that fired.
    ///
    /// Payloads that hold no reading are ignored. A command that cannot be
    /// run is logged and its trigger is not reported as fired.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading triggers fails.
    #[tracing::instrument(skip(self, event), fields(event = %event.name))]
    pub async fn process_event(&self, event: &Event) -> Result<Vec<String>, AppError> {
        let Some(reading) = first_reading(event) else {
            tracing::debug!("no reading in payload");
            return Ok(Vec::new());
        };

        let mut filter = Document::new();
        match self.scope {
            TriggerScope::Device => filter.insert("deviceId".to_string(), json!(reading.device_id)),
            TriggerScope::Event => filter.insert("event".to_string(), json!(event.name)),
        };
        let triggers = self.triggers.find_many(filter).await?;

        let mut fired = Vec::new();
        for trigger in &triggers {
            if trigger.kind != TriggerKind::Value {
                continue;
            }
            if trigger.threshold().is_none() {
                tracing::debug!(trigger = %trigger.id, "threshold is not a finite number, skipped");
                continue;
            }
            if !trigger.evaluate(&reading) {
                continue;
            }

            match self
                .controller
                .run_command(&trigger.device_id, &trigger.command_id)
                .await
            {
                Ok(command) => {
                    tracing::info!(
                        trigger = %trigger.id,
                        device = %trigger.device_id,
                        command = %command.command,
                        value = reading.value,
                        "trigger fired"
                    );
                    fired.push(trigger.id.clone());
                }
                Err(err) => {
                    tracing::warn!(trigger = %trigger.id, error = %err, "trigger command failed");
                }
            }
        }

        Ok(fired)
    }
}

fn first_reading(event: &Event) -> Option<Reading> {
    let first = event.items().into_iter().next()?;
    match serde_json::from_value::<Reading>(first.clone()) {
        Ok(reading) => Some(reading),
        Err(err) => {
            tracing::debug!(error = %err, "payload is not a reading");
            None
        }
    }
}
