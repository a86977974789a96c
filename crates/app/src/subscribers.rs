//! Built-in event subscribers.

use tendril_domain::error::AppError;
use tendril_domain::event::WILDCARD;

use crate::event_bus::EventBus;

/// Log every event on the bus at debug level.
///
/// # Errors
///
/// Propagates the registration error of the bus.
pub fn log_events(bus: &EventBus) -> Result<(), AppError> {
    bus.on(WILDCARD, |event| async move {
        tracing::debug!(event = %event.name, payload = %event.payload, "event");
        Ok(())
    })
}
