//! Device: a physical or virtual thing reached through a driver.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::record::Record;

/// Collection name of device records.
pub const COLLECTION: &str = "devices";

/// What a device can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Sensor,
    Actuator,
    Both,
}

impl DeviceRole {
    /// Whether values can be read from the device.
    #[must_use]
    pub fn can_sense(self) -> bool {
        matches!(self, Self::Sensor | Self::Both)
    }

    /// Whether commands can be written to the device.
    #[must_use]
    pub fn can_actuate(self) -> bool {
        matches!(self, Self::Actuator | Self::Both)
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sensor => "sensor",
            Self::Actuator => "actuator",
            Self::Both => "both",
        })
    }
}

/// A registered device.
///
/// `driver` names the driver kind responsible for the device and `address`
/// is opaque to everything but that driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub role: DeviceRole,
    pub driver: String,
    pub address: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Map<String, Value>>,
}

impl Device {
    /// JSON schema of a persisted device.
    #[must_use]
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "role": { "type": "string", "enum": ["sensor", "actuator", "both"] },
                "driver": { "type": "string", "minLength": 1 },
                "address": { "type": "object" },
                "labels": { "type": "object" }
            },
            "required": ["id", "role", "driver", "address"]
        })
    }

    /// Whether the device carries an address a driver can use.
    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.address.is_empty()
    }
}

impl Record for Device {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_allow_both_role_to_sense_and_actuate() {
        assert!(DeviceRole::Both.can_sense());
        assert!(DeviceRole::Both.can_actuate());
        assert!(DeviceRole::Sensor.can_sense());
        assert!(!DeviceRole::Sensor.can_actuate());
        assert!(!DeviceRole::Actuator.can_sense());
        assert!(DeviceRole::Actuator.can_actuate());
    }

    #[test]
    fn should_deserialize_device_without_labels() {
        let device: Device = serde_json::from_value(json!({
            "id": "d1",
            "role": "actuator",
            "driver": "virtual",
            "address": { "channel": 3 }
        }))
        .unwrap();
        assert_eq!(device.role, DeviceRole::Actuator);
        assert!(device.labels.is_none());
        assert!(device.has_address());
    }

    #[test]
    fn should_reject_unknown_role() {
        let result: Result<Device, _> = serde_json::from_value(json!({
            "id": "d1",
            "role": "oracle",
            "driver": "virtual",
            "address": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn should_display_role_as_wire_name() {
        assert_eq!(DeviceRole::Sensor.to_string(), "sensor");
    }
}
