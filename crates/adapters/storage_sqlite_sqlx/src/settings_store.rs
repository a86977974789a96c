//! `SQLite` implementation of [`SettingsStore`].
//!
//! Each top-level key of a scope is one row whose value is stored as JSON,
//! so a shallow merge is an upsert per key.

use serde_json::Value;
use sqlx::SqlitePool;

use tendril_app::ports::{Document, SettingsScope, SettingsStore};
use tendril_domain::error::AppError;

use crate::error::StorageError;

const SELECT_SCOPE: &str = "SELECT key, value FROM settings WHERE scope = ? ORDER BY key";
const UPSERT: &str = r"
    INSERT INTO settings (scope, key, value) VALUES (?, ?, ?)
    ON CONFLICT (scope, key) DO UPDATE SET value = excluded.value
";

/// `SQLite`-backed settings and manifest store.
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn load<'e, E>(executor: E, scope: SettingsScope) -> Result<Document, StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let rows: Vec<(String, String)> = sqlx::query_as(SELECT_SCOPE)
        .bind(scope.as_str())
        .fetch_all(executor)
        .await?;
    rows.into_iter()
        .map(|(key, value)| -> Result<(String, Value), StorageError> {
            Ok((key, serde_json::from_str(&value)?))
        })
        .collect()
}

#[async_trait::async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, scope: SettingsScope) -> Result<Document, AppError> {
        Ok(load(&self.pool, scope).await?)
    }

    async fn merge(&self, scope: SettingsScope, patch: Document) -> Result<Document, AppError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for (key, value) in &patch {
            let value = serde_json::to_string(value).map_err(StorageError::from)?;
            sqlx::query(UPSERT)
                .bind(scope.as_str())
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        let merged = load(&mut *tx, scope).await?;
        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(%scope, keys = patch.len(), "settings merged");
        Ok(merged)
    }
}
