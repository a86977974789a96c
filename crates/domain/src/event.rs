//! Event: an immutable record of something that happened.
//!
//! Modules emit lifecycle events (`<collection>.created`, `.updated`,
//! `.deleted`) after successful persistence; feature services emit their own
//! named events. Listeners subscribe by exact name or through [`WILDCARD`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::{Timestamp, now};

/// Listener name that receives every event.
pub const WILDCARD: &str = "*";

/// Emitted with one reading, or an array of readings, after ingest.
pub const READINGS_CREATED: &str = "readings.created";
/// Emitted after a command has been written to a device.
pub const DEVICE_COMMAND_SENT: &str = "device.command.sent";
/// Emitted after a value has been read from a device.
pub const DEVICE_VALUE_READ: &str = "device.value.read";
/// Emitted after the manifest has been merged.
pub const MANIFEST_UPDATED: &str = "settings.manifest.updated";

/// A named occurrence with a JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: now(),
        }
    }

    /// Payload items: the array's elements, or the payload itself.
    #[must_use]
    pub fn items(&self) -> Vec<&Value> {
        match &self.payload {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

/// Lifecycle step of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    Updated,
    Deleted,
}

impl Lifecycle {
    /// `<collection>.<step>`
    #[must_use]
    pub fn event_name(self, collection: &str) -> String {
        format!("{collection}.{self}")
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_build_lifecycle_event_names() {
        assert_eq!(Lifecycle::Created.event_name("widgets"), "widgets.created");
        assert_eq!(Lifecycle::Updated.event_name("widgets"), "widgets.updated");
        assert_eq!(Lifecycle::Deleted.event_name("widgets"), "widgets.deleted");
        assert_eq!(Lifecycle::Created.event_name("readings"), READINGS_CREATED);
    }

    #[test]
    fn should_expose_array_payload_as_items() {
        let event = Event::new(READINGS_CREATED, json!([{"value": 1}, {"value": 2}]));
        assert_eq!(event.items().len(), 2);
    }

    #[test]
    fn should_expose_object_payload_as_single_item() {
        let event = Event::new(READINGS_CREATED, json!({"value": 1}));
        let items = event.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["value"], 1);
    }
}
