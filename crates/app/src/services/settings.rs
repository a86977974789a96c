//! Settings and manifest endpoints, passed through to the settings store.

use std::sync::Arc;

use serde_json::Value;
use tendril_domain::error::{AppError, ValidationError};
use tendril_domain::event::MANIFEST_UPDATED;

use crate::event_bus::EventBus;
use crate::ports::{Document, SettingsScope, SettingsStore};
use crate::route::{Method, RouteDescriptor, RouteResponse, handler};

pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    events: Arc<EventBus>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Current map of `scope`.
    ///
    /// # Errors
    ///
    /// Storage errors from the settings store.
    pub async fn get(&self, scope: SettingsScope) -> Result<Document, AppError> {
        self.store.get(scope).await
    }

    /// Shallow-merge `patch` into `scope`. Merging the manifest emits
    /// `settings.manifest.updated` with the merged map.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when `patch` is not an object, or a storage
    /// error from the settings store.
    #[tracing::instrument(skip(self, patch))]
    pub async fn merge(&self, scope: SettingsScope, patch: Value) -> Result<Document, AppError> {
        let Value::Object(patch) = patch else {
            return Err(ValidationError::field("", "expected an object").into());
        };
        let merged = self.store.merge(scope, patch).await?;
        if scope == SettingsScope::Manifest {
            self.events
                .emit(MANIFEST_UPDATED, Value::Object(merged.clone()));
        }
        Ok(merged)
    }

    /// `GET`/`PUT` on `/settings` and `/manifest`.
    pub fn routes(self: &Arc<Self>) -> Vec<RouteDescriptor> {
        [SettingsScope::Settings, SettingsScope::Manifest]
            .into_iter()
            .flat_map(|scope| {
                let path = format!("/{scope}");
                let get = {
                    let this = Arc::clone(self);
                    handler(move |_req| {
                        let this = Arc::clone(&this);
                        async move { RouteResponse::json(&this.get(scope).await?) }
                    })
                };
                let put = {
                    let this = Arc::clone(self);
                    handler(move |req| {
                        let this = Arc::clone(&this);
                        async move { RouteResponse::json(&this.merge(scope, req.body).await?) }
                    })
                };
                [
                    RouteDescriptor::new(Method::Get, path.clone(), get)
                        .summary(format!("Read the {scope}")),
                    RouteDescriptor::new(Method::Put, path, put)
                        .summary(format!("Merge into the {scope}"))
                        .description(format!("Shallow-merge the body into the stored {scope}"))
                        .body_schema(Some(serde_json::json!({ "type": "object" }))),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteRequest;
    use crate::testing::MemorySettings;
    use serde_json::json;

    fn service() -> (Arc<SettingsService>, Arc<EventBus>) {
        let events = Arc::new(EventBus::default());
        let service = SettingsService::new(Arc::new(MemorySettings::default()), Arc::clone(&events));
        (Arc::new(service), events)
    }

    #[tokio::test]
    async fn should_merge_settings_shallowly() {
        let (service, _) = service();
        service
            .merge(SettingsScope::Settings, json!({"a": 1, "nested": {"x": 1}}))
            .await
            .unwrap();
        let merged = service
            .merge(SettingsScope::Settings, json!({"b": 2, "nested": {"y": 2}}))
            .await
            .unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2, "nested": {"y": 2}}));
    }

    #[tokio::test]
    async fn should_emit_event_only_when_manifest_changes() {
        let (service, events) = service();
        let mut rx = events.subscribe();
        service
            .merge(SettingsScope::Settings, json!({"a": 1}))
            .await
            .unwrap();
        service
            .merge(SettingsScope::Manifest, json!({"name": "greenhouse"}))
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, MANIFEST_UPDATED);
        assert_eq!(event.payload["name"], "greenhouse");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_reject_non_object_patch() {
        let (service, _) = service();
        let err = service
            .merge(SettingsScope::Settings, json!([1]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 422);
    }

    #[tokio::test]
    async fn should_expose_get_and_put_routes_for_both_scopes() {
        let (service, _) = service();
        let routes = service.routes();
        let shape: Vec<(Method, &str)> = routes.iter().map(|r| (r.method, r.path.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (Method::Get, "/settings"),
                (Method::Put, "/settings"),
                (Method::Get, "/manifest"),
                (Method::Put, "/manifest"),
            ]
        );
        routes[3]
            .call(RouteRequest {
                body: json!({"v": 1}),
                ..RouteRequest::default()
            })
            .await
            .unwrap();
        let manifest = routes[2].call(RouteRequest::default()).await.unwrap();
        assert_eq!(manifest.body, json!({"v": 1}));
    }
}
