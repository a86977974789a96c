//! Storage-specific error type wrapping sqlx errors.

use tendril_domain::error::AppError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored JSON value could not be (de)serialized.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored document is not a JSON object.
    #[error("document {collection}/{id} is not an object")]
    Corrupted { collection: String, id: String },
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
