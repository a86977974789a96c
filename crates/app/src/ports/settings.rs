//! Settings port: shallow key-value maps for settings and the manifest.

use std::fmt;

use tendril_domain::error::AppError;

use super::Document;

/// Which map of the store is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsScope {
    Settings,
    Manifest,
}

impl SettingsScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Manifest => "manifest",
        }
    }
}

impl fmt::Display for SettingsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value settings persistence.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current map for `scope` (empty when nothing was stored).
    async fn get(&self, scope: SettingsScope) -> Result<Document, AppError>;

    /// Shallow-merge `patch` into the map for `scope`, persist it and return
    /// the merged map.
    async fn merge(&self, scope: SettingsScope, patch: Document) -> Result<Document, AppError>;
}
