//! In-memory document store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use tendril_app::ports::repository::{assign_id, duplicate_id, merge};
use tendril_app::ports::{Database, Document, Filter, Repository};
use tendril_domain::error::AppError;
use tendril_domain::id::ID_FIELD;

/// One collection, kept in insertion order.
#[derive(Debug)]
pub struct MemoryRepository {
    collection: String,
    documents: RwLock<Vec<Document>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

fn id_of(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(|id| id.as_str())
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .documents
            .read()
            .iter()
            .find(|doc| id_of(doc) == Some(id))
            .cloned())
    }

    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn create(&self, document: Document) -> Result<Document, AppError> {
        let mut created = self.create_many(vec![document]).await?;
        created
            .pop()
            .ok_or_else(|| AppError::internal("create produced no document"))
    }

    /// All documents are stored, or none.
    async fn create_many(&self, documents: Vec<Document>) -> Result<Vec<Document>, AppError> {
        let documents: Vec<Document> = documents.into_iter().map(assign_id).collect();
        let mut store = self.documents.write();
        for (index, document) in documents.iter().enumerate() {
            let id = id_of(document).unwrap_or_default();
            let taken = store.iter().chain(&documents[..index]).any(|doc| id_of(doc) == Some(id));
            if taken {
                return Err(duplicate_id(id));
            }
        }
        store.extend(documents.iter().cloned());
        tracing::debug!(collection = %self.collection, count = documents.len(), "documents stored");
        Ok(documents)
    }

    async fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, AppError> {
        let mut store = self.documents.write();
        Ok(store
            .iter_mut()
            .find(|doc| id_of(doc) == Some(id))
            .map(|doc| {
                merge(doc, patch);
                doc.clone()
            }))
    }

    async fn delete(&self, id: &str) -> Result<Option<Document>, AppError> {
        let mut store = self.documents.write();
        Ok(store
            .iter()
            .position(|doc| id_of(doc) == Some(id))
            .map(|index| store.remove(index)))
    }
}

/// Hands out one [`MemoryRepository`] per collection; asking twice for the
/// same collection yields the same store.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    repositories: Mutex<HashMap<String, Arc<MemoryRepository>>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for MemoryDatabase {
    fn repository(&self, collection: &str) -> Arc<dyn Repository> {
        let mut repositories = self.repositories.lock();
        let repository = repositories
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(MemoryRepository::new(collection)));
        Arc::clone(repository) as Arc<dyn Repository>
    }
}
