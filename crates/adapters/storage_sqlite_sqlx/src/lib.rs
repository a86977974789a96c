//! # tendril-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `Database`/`Repository` and `SettingsStore` ports defined
//!   in `tendril-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Store every collection as JSON documents in one table
//!
//! ## Dependency rule
//! Depends on `tendril-app` (for port traits) and `tendril-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod document_repo;
pub mod error;
pub mod pool;
pub mod settings_store;

pub use document_repo::SqliteRepository;
pub use error::StorageError;
pub use pool::{Config, SqliteDatabase};
pub use settings_store::SqliteSettingsStore;
