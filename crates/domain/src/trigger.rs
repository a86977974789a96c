//! Trigger: a comparator rule that turns a reading into a device command.
//!
//! A `value` trigger fires when `reading.value <operation> threshold`, where
//! the threshold is the trigger's `value` parsed as a number. `cron`
//! triggers are stored but never evaluated against readings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::reading::Reading;
use crate::record::Record;

/// Collection name of trigger records.
pub const COLLECTION: &str = "triggers";

/// How a trigger is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Cron,
    Value,
}

/// Comparator applied as `reading <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Operation {
    /// Apply the comparator.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(self, reading: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => reading > threshold,
            Self::Lt => reading < threshold,
            Self::Eq => reading == threshold,
            Self::Ne => reading != threshold,
            Self::Ge => reading >= threshold,
            Self::Le => reading <= threshold,
        }
    }

    /// Wire symbol of the comparator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A stored trigger rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    pub name: String,
    /// Event name the trigger listens to.
    pub event: String,
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub operation: Operation,
    pub device_id: String,
    pub command_id: String,
}

impl Trigger {
    /// JSON schema of a persisted trigger.
    ///
    /// `type = cron` requires a non-empty `cron`; `type = value` requires a
    /// non-empty `value`.
    #[must_use]
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "name": { "type": "string" },
                "event": { "type": "string", "minLength": 1 },
                "type": { "type": "string", "enum": ["cron", "value"] },
                "cron": { "type": "string" },
                "value": { "type": "string" },
                "operation": { "type": "string", "enum": [">", "<", "==", "!=", ">=", "<="] },
                "deviceId": { "type": "string" },
                "commandId": { "type": "string" }
            },
            "required": ["id", "name", "event", "type", "operation", "deviceId", "commandId"],
            "allOf": [
                {
                    "if": {
                        "properties": { "type": { "const": "cron" } },
                        "required": ["type"]
                    },
                    "then": {
                        "properties": { "cron": { "minLength": 1 } },
                        "required": ["cron"]
                    }
                },
                {
                    "if": {
                        "properties": { "type": { "const": "value" } },
                        "required": ["type"]
                    },
                    "then": {
                        "properties": { "value": { "minLength": 1 } },
                        "required": ["value"]
                    }
                }
            ]
        })
    }

    /// Threshold parsed from `value`; `None` when absent, unparsable or not
    /// finite.
    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        self.value
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|threshold| threshold.is_finite())
    }

    /// Whether this trigger fires for `reading`.
    ///
    /// Only `value` triggers with a usable threshold can fire.
    #[must_use]
    pub fn evaluate(&self, reading: &Reading) -> bool {
        if self.kind != TriggerKind::Value {
            return false;
        }
        self.threshold()
            .is_some_and(|threshold| self.operation.compare(reading.value, threshold))
    }
}

impl Record for Trigger {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TriggerKind::Cron => write!(f, "{}(cron {})", self.name, self.cron.as_deref().unwrap_or("")),
            TriggerKind::Value => write!(
                f,
                "{}(reading {} {})",
                self.name,
                self.operation,
                self.value.as_deref().unwrap_or("")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn value_trigger(operation: Operation, value: &str) -> Trigger {
        Trigger {
            id: "t1".to_string(),
            name: "too hot".to_string(),
            event: "readings.created".to_string(),
            kind: TriggerKind::Value,
            cron: None,
            value: Some(value.to_string()),
            operation,
            device_id: "d1".to_string(),
            command_id: "c1".to_string(),
        }
    }

    fn reading(value: f64) -> Reading {
        Reading {
            id: "r1".to_string(),
            device_id: "d1".to_string(),
            value,
            timestamp: now(),
        }
    }

    #[test]
    fn should_apply_every_comparator() {
        assert!(Operation::Gt.compare(35.0, 30.0));
        assert!(!Operation::Gt.compare(30.0, 30.0));
        assert!(Operation::Lt.compare(25.0, 30.0));
        assert!(Operation::Eq.compare(30.0, 30.0));
        assert!(Operation::Ne.compare(31.0, 30.0));
        assert!(Operation::Ge.compare(30.0, 30.0));
        assert!(Operation::Le.compare(30.0, 30.0));
        assert!(!Operation::Le.compare(30.5, 30.0));
    }

    #[test]
    fn should_fire_when_reading_exceeds_threshold() {
        let trigger = value_trigger(Operation::Gt, "30");
        assert!(trigger.evaluate(&reading(35.0)));
        assert!(!trigger.evaluate(&reading(25.0)));
    }

    #[test]
    fn should_not_fire_when_threshold_is_not_a_number() {
        let trigger = value_trigger(Operation::Gt, "warm");
        assert_eq!(trigger.threshold(), None);
        assert!(!trigger.evaluate(&reading(35.0)));
    }

    #[test]
    fn should_not_fire_when_threshold_is_infinite() {
        let trigger = value_trigger(Operation::Lt, "inf");
        assert_eq!(trigger.threshold(), None);
        assert!(!trigger.evaluate(&reading(1.0)));
    }

    #[test]
    fn should_trim_threshold_before_parsing() {
        let trigger = value_trigger(Operation::Ge, " 12.5 ");
        assert_eq!(trigger.threshold(), Some(12.5));
    }

    #[test]
    fn should_never_fire_cron_trigger_on_reading() {
        let mut trigger = value_trigger(Operation::Gt, "0");
        trigger.kind = TriggerKind::Cron;
        trigger.cron = Some("*/5 * * * *".to_string());
        assert!(!trigger.evaluate(&reading(10.0)));
    }

    #[test]
    fn should_round_trip_wire_field_names() {
        let trigger = value_trigger(Operation::Ne, "1");
        let json = serde_json::to_value(&trigger).unwrap();
        assert_eq!(json["type"], "value");
        assert_eq!(json["operation"], "!=");
        assert_eq!(json["deviceId"], "d1");
        assert_eq!(json["commandId"], "c1");
        assert!(json.get("cron").is_none());
    }
}
