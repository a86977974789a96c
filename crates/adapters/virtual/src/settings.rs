//! In-memory settings store.

use std::collections::HashMap;

use parking_lot::Mutex;

use tendril_app::ports::{Document, SettingsScope, SettingsStore};
use tendril_domain::error::AppError;

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    maps: Mutex<HashMap<SettingsScope, Document>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, scope: SettingsScope) -> Result<Document, AppError> {
        Ok(self.maps.lock().get(&scope).cloned().unwrap_or_default())
    }

    async fn merge(&self, scope: SettingsScope, patch: Document) -> Result<Document, AppError> {
        let mut maps = self.maps.lock();
        let map = maps.entry(scope).or_default();
        map.extend(patch);
        Ok(map.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn should_start_empty() {
        let store = MemorySettingsStore::new();
        assert!(store.get(SettingsScope::Settings).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_merge_shallowly_per_scope() {
        let store = MemorySettingsStore::new();
        store
            .merge(SettingsScope::Settings, doc(json!({"a": 1, "b": {"x": 1}})))
            .await
            .unwrap();
        let merged = store
            .merge(SettingsScope::Settings, doc(json!({"b": {"y": 2}})))
            .await
            .unwrap();
        assert_eq!(merged, doc(json!({"a": 1, "b": {"y": 2}})));
        assert!(store.get(SettingsScope::Manifest).await.unwrap().is_empty());
    }
}
