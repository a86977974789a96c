//! Shared application state for axum handlers.

use std::sync::Arc;

use tendril_app::registry::Api;

/// State shared by the adapter-native handlers.
///
/// Descriptor routes capture their own handler and need no state.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<Api>,
}

impl AppState {
    #[must_use]
    pub fn new(api: Api) -> Self {
        Self { api: Arc::new(api) }
    }
}
