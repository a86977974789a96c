//! In-process event bus with wildcard listeners.
//!
//! Listeners registered under [`WILDCARD`] run before listeners registered
//! for the exact event name, each group in registration order. A failing or
//! panicking listener is logged and does not stop the ones after it.
//!
//! Every event is also sent on a tokio [`broadcast`] channel so streaming
//! consumers (the SSE endpoint) can follow the bus without registering a
//! listener.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;

use tendril_domain::error::{AppError, ValidationError};
use tendril_domain::event::{Event, WILDCARD};

/// Callback invoked with each matching event.
pub type Listener = Arc<dyn Fn(Event) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync>;

/// In-process publish/subscribe.
///
/// Listener registration is expected at startup; registering while events
/// are being dispatched is not supported.
pub struct EventBus {
    listeners: RwLock<Vec<(String, Listener)>>,
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus whose broadcast channel buffers `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            listeners: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Register `listener` for `name` (or [`WILDCARD`]).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when `name` is empty.
    pub fn on<F, Fut>(&self, name: impl Into<String>, listener: F) -> Result<(), AppError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::field("event", "event name must not be empty").into());
        }
        let listener: Listener = Arc::new(move |event| listener(event).boxed());
        tracing::debug!(event = %name, "listener registered");
        self.listeners.write().push((name, listener));
        Ok(())
    }

    /// Receive every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of registered listeners, wildcard included.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Emit and wait for every listener to finish.
    pub async fn dispatch(&self, name: impl Into<String>, payload: Value) {
        let event = self.publish(Event::new(name, payload));
        let listeners = self.snapshot(&event.name);
        run(listeners, event).await;
    }

    /// Emit without waiting: listeners run on a spawned task.
    ///
    /// The listener list is captured before returning. Outside a tokio
    /// runtime the listeners are skipped and the event is dropped.
    pub fn emit(&self, name: impl Into<String>, payload: Value) {
        let event = self.publish(Event::new(name, payload));
        let listeners = self.snapshot(&event.name);
        if listeners.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run(listeners, event));
            }
            Err(_) => {
                tracing::warn!(event = %event.name, "no async runtime, event dropped");
            }
        }
    }

    fn publish(&self, event: Event) -> Event {
        tracing::debug!(event = %event.name, "event emitted");
        // fails only without subscribers
        let _ = self.sender.send(event.clone());
        event
    }

    fn snapshot(&self, name: &str) -> Vec<Listener> {
        let listeners = self.listeners.read();
        let wildcard = listeners
            .iter()
            .filter(|(registered, _)| registered == WILDCARD);
        let exact = listeners
            .iter()
            .filter(|(registered, _)| name != WILDCARD && registered == name);
        wildcard
            .chain(exact)
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

async fn run(listeners: Vec<Listener>, event: Event) {
    for listener in listeners {
        match AssertUnwindSafe(listener(event.clone())).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(event = %event.name, error = %err, "event listener failed");
            }
            Err(panic) => {
                tracing::warn!(event = %event.name, panic = panic_message(&*panic), "event listener panicked");
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
