//! Driver port: reading and writing values at a device address.
//!
//! Each driver serves one driver *kind* (the `driver` field of a device).
//! Wire protocols live behind this trait; the application only routes a
//! device to the driver registered for its kind.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tendril_domain::error::DriverError;

/// A device driver.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Driver kind served by this driver, e.g. `virtual`.
    fn kind(&self) -> &str;

    /// Read the current value at `address`.
    async fn read(&self, address: &Map<String, Value>) -> Result<Value, DriverError>;

    /// Write `command` to `address`.
    async fn write(&self, address: &Map<String, Value>, command: &str) -> Result<(), DriverError>;
}

/// Drivers keyed by kind.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` under its own kind, replacing any previous one.
    #[must_use]
    pub fn with(mut self, driver: Arc<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        tracing::info!(kind = driver.kind(), "driver registered");
        self.drivers.insert(driver.kind().to_string(), driver);
    }

    /// Driver serving `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnknownKind`] when nothing is registered for `kind`.
    pub fn get(&self, kind: &str) -> Result<Arc<dyn Driver>, DriverError> {
        self.drivers
            .get(kind)
            .cloned()
            .ok_or_else(|| DriverError::UnknownKind(kind.to_string()))
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubDriver;

    #[test]
    fn should_resolve_driver_by_kind() {
        let registry = DriverRegistry::new().with(Arc::new(StubDriver::new("stub")));
        assert_eq!(registry.get("stub").unwrap().kind(), "stub");
        assert_eq!(registry.kinds(), vec!["stub"]);
    }

    #[test]
    fn should_fail_when_kind_is_unknown() {
        let registry = DriverRegistry::new();
        let err = registry.get("zigbee").err().unwrap();
        assert_eq!(err, DriverError::UnknownKind("zigbee".to_string()));
    }
}
