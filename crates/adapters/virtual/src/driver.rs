//! Virtual loopback driver.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use tendril_app::ports::Driver;
use tendril_domain::error::DriverError;

/// Value read from an address nothing was written to.
pub const DEFAULT_READING: f64 = 21.5;

/// A simulated device bus.
///
/// Every address holds one value. Writes change it:
///
/// | Command | New value |
/// |---------|-----------|
/// | `on` / `off` | `true` / `false` |
/// | `toggle` | negation of the current boolean |
/// | a number | that number |
/// | anything else | the command as a string |
///
/// Reads return the current value, else the address's own `value` field,
/// else [`DEFAULT_READING`].
pub struct VirtualDriver {
    kind: String,
    values: Mutex<HashMap<String, Value>>,
    history: Mutex<Vec<(Map<String, Value>, String)>>,
}

impl Default for VirtualDriver {
    fn default() -> Self {
        Self::with_kind("virtual")
    }
}

impl VirtualDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A virtual driver registered under another kind, so that devices of
    /// that kind can be exercised without hardware.
    #[must_use]
    pub fn with_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            values: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Force the value at `address`.
    pub fn set(&self, address: &Map<String, Value>, value: Value) {
        self.values.lock().insert(address_key(address), value);
    }

    /// Every command written so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<(Map<String, Value>, String)> {
        self.history.lock().clone()
    }
}

#[async_trait::async_trait]
impl Driver for VirtualDriver {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn read(&self, address: &Map<String, Value>) -> Result<Value, DriverError> {
        let value = self
            .values
            .lock()
            .get(&address_key(address))
            .cloned()
            .or_else(|| address.get("value").cloned())
            .unwrap_or_else(|| json!(DEFAULT_READING));
        tracing::debug!(kind = %self.kind, %value, "virtual read");
        Ok(value)
    }

    async fn write(&self, address: &Map<String, Value>, command: &str) -> Result<(), DriverError> {
        if command.trim().is_empty() {
            return Err(DriverError::Failed("empty command".to_string()));
        }
        let key = address_key(address);
        let mut values = self.values.lock();
        let next = match command {
            "on" => Value::Bool(true),
            "off" => Value::Bool(false),
            "toggle" => Value::Bool(!values.get(&key).and_then(Value::as_bool).unwrap_or(false)),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map_or_else(|| Value::String(other.to_string()), |number| json!(number)),
        };
        tracing::info!(kind = %self.kind, command, value = %next, "virtual write");
        values.insert(key, next);
        drop(values);
        self.history.lock().push((address.clone(), command.to_string()));
        Ok(())
    }
}

impl std::fmt::Debug for VirtualDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDriver")
            .field("kind", &self.kind)
            .field("addresses", &self.values.lock().len())
            .finish_non_exhaustive()
    }
}

/// Addresses are compared by their JSON text; `Map` keeps keys sorted.
fn address_key(address: &Map<String, Value>) -> String {
    Value::Object(address.clone()).to_string()
}
