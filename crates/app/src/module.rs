//! Module: the schema-validated CRUD unit bound to one collection.
//!
//! A module owns its [`EntitySchema`] and [`Repository`], shares the
//! [`EventBus`], and is the only path through which records of its
//! collection are created, changed or removed.
//!
//! Validation always precedes persistence; a lifecycle event is emitted only
//! after persistence succeeded.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tendril_domain::error::{AppError, NotFoundError, ValidationError};
use tendril_domain::event::Lifecycle;
use tendril_domain::record::Record;

use crate::event_bus::EventBus;
use crate::ports::{Document, Filter, Repository};
use crate::schema::{EntitySchema, SchemaKind, SchemaProvider};

/// Generic entity module over record type `T`.
pub struct Module<T> {
    name: String,
    schema: EntitySchema,
    repository: Arc<dyn Repository>,
    events: Arc<EventBus>,
    record: PhantomData<fn() -> T>,
}

impl<T: Record> Module<T> {
    pub fn new(
        name: impl Into<String>,
        schema: EntitySchema,
        repository: Arc<dyn Repository>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            repository,
            events,
            record: PhantomData,
        }
    }

    /// Collection name, also the prefix of lifecycle events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no record has `id`, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self), fields(module = %self.name))]
    pub async fn find_one(&self, id: &str) -> Result<T, AppError> {
        let document = self
            .repository
            .find_one(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        self.decode(document)
    }

    /// List records matching every field of `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when `filter` fails the query schema,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self, filter), fields(module = %self.name))]
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, AppError> {
        self.schema
            .validate(SchemaKind::Query, &Value::Object(filter.clone()))?;
        let documents = self.repository.find_many(&Filter::from(filter)).await?;
        documents.into_iter().map(|doc| self.decode(doc)).collect()
    }

    /// Validate, persist and announce a new record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when `data` fails the create schema,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self, data), fields(module = %self.name))]
    pub async fn create(&self, data: Value) -> Result<T, AppError> {
        let document = self.check(SchemaKind::Create, data)?;
        let created = self.repository.create(document).await?;
        let record = self.decode(created.clone())?;
        self.events
            .emit(Lifecycle::Created.event_name(&self.name), Value::Object(created));
        Ok(record)
    }

    /// Validate every item, persist them all, and emit a single
    /// `<name>.created` event carrying the array of records.
    ///
    /// Nothing is persisted when any item is invalid. An empty batch is a
    /// no-op and emits nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] on the first invalid item, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, items), fields(module = %self.name, count = items.len()))]
    pub async fn create_many(&self, items: Vec<Value>) -> Result<Vec<T>, AppError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let documents = items
            .into_iter()
            .map(|item| self.check(SchemaKind::Create, item))
            .collect::<Result<Vec<_>, _>>()?;
        let created = self.repository.create_many(documents).await?;
        let records = created
            .iter()
            .cloned()
            .map(|doc| self.decode(doc))
            .collect::<Result<Vec<_>, _>>()?;
        let payload = Value::Array(created.into_iter().map(Value::Object).collect());
        self.events
            .emit(Lifecycle::Created.event_name(&self.name), payload);
        Ok(records)
    }

    /// Validate `partial` and shallow-merge it into the record with `id`.
    ///
    /// The update schema is used when declared, the create schema otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when `partial` is rejected,
    /// [`AppError::NotFound`] when no record has `id`, or a storage error.
    #[tracing::instrument(skip(self, partial), fields(module = %self.name))]
    pub async fn update(&self, id: &str, partial: Value) -> Result<T, AppError> {
        let kind = if self.schema.has(SchemaKind::Update) {
            SchemaKind::Update
        } else {
            SchemaKind::Create
        };
        let patch = self.check(kind, partial)?;
        let updated = self
            .repository
            .update(id, patch)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let record = self.decode(updated.clone())?;
        self.events
            .emit(Lifecycle::Updated.event_name(&self.name), Value::Object(updated));
        Ok(record)
    }

    /// Remove the record with `id` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no record has `id`, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self), fields(module = %self.name))]
    pub async fn delete(&self, id: &str) -> Result<T, AppError> {
        let deleted = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let record = self.decode(deleted.clone())?;
        self.events
            .emit(Lifecycle::Deleted.event_name(&self.name), Value::Object(deleted));
        Ok(record)
    }

    fn check(&self, kind: SchemaKind, payload: Value) -> Result<Document, AppError> {
        self.schema.validate(kind, &payload)?;
        match payload {
            Value::Object(document) => Ok(document),
            _ => Err(ValidationError::field("", "payload must be an object").into()),
        }
    }

    fn decode(&self, document: Document) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(document)).map_err(|err| {
            AppError::internal(format!("malformed {} record: {err}", self.name))
        })
    }

    fn not_found(&self, id: &str) -> AppError {
        NotFoundError::new(self.name.as_str(), id).into()
    }
}

impl<T> SchemaProvider for Module<T> {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }
}

impl<T> std::fmt::Debug for Module<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
