//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use tendril_app::ports::{Database, Repository};

use crate::document_repo::SqliteRepository;
use crate::error::StorageError;
use crate::settings_store::SqliteSettingsStore;

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:tendril.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Build a [`SqliteDatabase`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    pub async fn build(self) -> Result<SqliteDatabase, StorageError> {
        SqliteDatabase::initialize(&self.database_url).await
    }
}

/// Holds the `SQLite` connection pool and hands out one repository per
/// collection.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to the database and run migrations.
    ///
    /// An in-memory database lives as long as its connection, so it gets a
    /// single connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    async fn initialize(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url = %database_url, "sqlite database ready");

        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Settings store sharing this pool.
    #[must_use]
    pub fn settings(&self) -> SqliteSettingsStore {
        SqliteSettingsStore::new(self.pool.clone())
    }
}

impl Database for SqliteDatabase {
    fn repository(&self, collection: &str) -> Arc<dyn Repository> {
        Arc::new(SqliteRepository::new(self.pool.clone(), collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_create_pool_and_run_migrations_when_using_memory_db() {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
        };
        let db = config.build().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|row| row.0.as_str()).collect();
        assert_eq!(names, vec!["documents", "settings"]);
    }

    #[tokio::test]
    async fn should_scope_repository_to_collection() {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        assert_eq!(db.repository("devices").collection(), "devices");
    }
}
