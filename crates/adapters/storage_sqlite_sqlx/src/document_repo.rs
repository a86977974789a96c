//! `SQLite` implementation of [`Repository`]: one collection of JSON
//! documents in the shared `documents` table.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};

use tendril_app::ports::repository::{assign_id, duplicate_id, merge};
use tendril_app::ports::{Document, Filter, Repository};
use tendril_domain::error::AppError;
use tendril_domain::id::ID_FIELD;

use crate::error::StorageError;

/// Wrapper for decoding the `data` column into a [`Document`].
struct Wrapper(Document);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let data: String = row.try_get("data")?;
        match serde_json::from_str(&data).map_err(|err| sqlx::Error::Decode(Box::new(err)))? {
            Value::Object(document) => Ok(Self(document)),
            _ => {
                let id: String = row.try_get("id")?;
                let collection: String = row.try_get("collection")?;
                Err(sqlx::Error::Decode(Box::new(StorageError::Corrupted {
                    collection,
                    id,
                })))
            }
        }
    }
}

const INSERT: &str = "INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM documents WHERE collection = ? AND id = ?";
const SELECT_ALL: &str = "SELECT * FROM documents WHERE collection = ? ORDER BY rowid";
const UPDATE: &str = "UPDATE documents SET data = ? WHERE collection = ? AND id = ?";
const DELETE_BY_ID: &str = "DELETE FROM documents WHERE collection = ? AND id = ?";

/// `SQLite`-backed document repository for one collection.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    collection: String,
}

impl SqliteRepository {
    /// Create a new repository for `collection` using the given pool.
    #[must_use]
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    async fn insert(&self, conn: &mut SqliteConnection, document: &Document) -> Result<(), AppError> {
        let id = document
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let data = serde_json::to_string(document).map_err(StorageError::from)?;
        let result = sqlx::query(INSERT)
            .bind(&self.collection)
            .bind(id)
            .bind(data)
            .execute(conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(duplicate_id(id)),
            Err(err) => Err(StorageError::from(err).into()),
        }
    }

    async fn select(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(&self.collection)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }
}

#[async_trait::async_trait]
impl Repository for SqliteRepository {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn find_one(&self, id: &str) -> Result<Option<Document>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        self.select(&mut *conn, id).await
    }

    /// Equality filters are applied after decoding.
    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, AppError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(|w| w.0)
            .filter(|document| filter.matches(document))
            .collect())
    }

    async fn create(&self, document: Document) -> Result<Document, AppError> {
        let document = assign_id(document);
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        self.insert(&mut *conn, &document).await?;
        Ok(document)
    }

    /// Inserts every document in one transaction.
    async fn create_many(&self, documents: Vec<Document>) -> Result<Vec<Document>, AppError> {
        let documents: Vec<Document> = documents.into_iter().map(assign_id).collect();
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for document in &documents {
            self.insert(&mut *tx, document).await?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(collection = %self.collection, count = documents.len(), "documents stored");
        Ok(documents)
    }

    /// Read, merge and write back inside one transaction.
    async fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, AppError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let Some(mut document) = self.select(&mut *tx, id).await? else {
            return Ok(None);
        };
        merge(&mut document, patch);
        let data = serde_json::to_string(&document).map_err(StorageError::from)?;
        sqlx::query(UPDATE)
            .bind(data)
            .bind(&self.collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(Some(document))
    }

    async fn delete(&self, id: &str) -> Result<Option<Document>, AppError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let document = self.select(&mut *tx, id).await?;
        if document.is_some() {
            sqlx::query(DELETE_BY_ID)
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(document)
    }
}
