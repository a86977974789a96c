//! The dependency aggregate threaded through module and service construction.

use std::sync::Arc;

use crate::event_bus::EventBus;
use crate::ports::{Database, DriverRegistry, SettingsStore};

/// Everything features need from the outside world, built once at startup.
#[derive(Clone)]
pub struct Dependencies {
    pub database: Arc<dyn Database>,
    pub events: Arc<EventBus>,
    pub drivers: DriverRegistry,
    pub settings: Arc<dyn SettingsStore>,
}

impl Dependencies {
    pub fn new(
        database: Arc<dyn Database>,
        drivers: DriverRegistry,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            database,
            events: Arc::new(EventBus::default()),
            drivers,
            settings,
        }
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("drivers", &self.drivers)
            .field("listeners", &self.events.listener_count())
            .finish_non_exhaustive()
    }
}
