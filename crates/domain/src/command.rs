//! Command: a named operation a driver can execute on a device.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::record::Record;

/// Collection name of command records.
pub const COLLECTION: &str = "commands";

/// A stored command.
///
/// `command` is an operation identifier; what it means is up to the driver
/// that receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub command: String,
}

impl Command {
    /// JSON schema of a persisted command.
    #[must_use]
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "command": { "type": "string", "minLength": 1 }
            },
            "required": ["id", "command"]
        })
    }
}

impl Record for Command {
    fn id(&self) -> &str {
        &self.id
    }
}
