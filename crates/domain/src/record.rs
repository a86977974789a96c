//! Record: anything a module can persist.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted record with a unique string identifier.
///
/// The identifier is assigned by the repository on create when absent, so a
/// record only exists in its typed form once it has been persisted.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The record's identifier.
    fn id(&self) -> &str;
}

/// A record whose shape is only known through its JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record for DynamicRecord {
    fn id(&self) -> &str {
        &self.id
    }
}
