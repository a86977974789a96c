//! In-memory port implementations shared by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tendril_domain::error::{AppError, DriverError};
use tendril_domain::record::DynamicRecord;

use crate::event_bus::EventBus;
use crate::module::Module;
use crate::ports::repository::{assign_id, merge};
use crate::ports::{
    Database, Document, Driver, Filter, Repository, SettingsScope, SettingsStore,
};
use crate::schema::EntitySchema;

pub struct MemoryRepository {
    collection: String,
    store: Mutex<BTreeMap<String, Document>>,
    calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            store: Mutex::new(BTreeMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Number of mutating calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self.store.lock().get(id).cloned())
    }

    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, AppError> {
        Ok(self
            .store
            .lock()
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn create(&self, document: Document) -> Result<Document, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let document = assign_id(document);
        let id = document["id"].as_str().unwrap_or_default().to_string();
        self.store.lock().insert(id, document.clone());
        Ok(document)
    }

    async fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.lock();
        Ok(store.get_mut(id).map(|doc| {
            merge(doc, patch);
            doc.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<Option<Document>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.lock().remove(id))
    }
}

#[derive(Default)]
pub struct MemoryDatabase {
    repositories: Mutex<HashMap<String, Arc<MemoryRepository>>>,
}

impl Database for MemoryDatabase {
    fn repository(&self, collection: &str) -> Arc<dyn Repository> {
        let mut repositories = self.repositories.lock();
        let repo = repositories
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(MemoryRepository::new(collection)));
        Arc::clone(repo) as Arc<dyn Repository>
    }
}

#[derive(Default)]
pub struct MemorySettings {
    maps: Mutex<HashMap<SettingsScope, Document>>,
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettings {
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

/// Driver that records writes and answers reads with a fixed value.
pub struct StubDriver {
    kind: String,
    value: Value,
    writes: Mutex<Vec<(Map<String, Value>, String)>>,
}

impl StubDriver {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: json!(21.5),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.writes
            .lock()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Driver for StubDriver {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn read(&self, _address: &Map<String, Value>) -> Result<Value, DriverError> {
        Ok(self.value.clone())
    }

    async fn write(&self, address: &Map<String, Value>, command: &str) -> Result<(), DriverError> {
        self.writes
            .lock()
            .push((address.clone(), command.to_string()));
        Ok(())
    }
}

pub fn widget_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" },
            "size": { "type": "integer" }
        },
        "required": ["id", "name"]
    })
}

pub fn widget_module() -> (Arc<Module<DynamicRecord>>, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new("widgets"));
    let schema = EntitySchema::from_record(widget_schema()).unwrap();
    let module = Module::new(
        "widgets",
        schema,
        Arc::clone(&repo) as Arc<dyn Repository>,
        Arc::new(EventBus::default()),
    );
    (Arc::new(module), repo)
}
