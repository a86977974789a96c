//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`AppError`]
//! via `#[from]`. The adapters at the edge (HTTP, tool invocation) translate
//! an [`AppError`] into a status code and an `{code, message, details}` body
//! using [`AppError::status`], [`AppError::code`] and [`AppError::details`].

use serde::{Deserialize, Serialize};

/// Top-level error returned by modules, services and ports.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A payload failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An id-keyed operation found nothing.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A device driver failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Build an [`AppError::Internal`] from any displayable message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP-style status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::NotFound(_) => 404,
            Self::Storage(_) | Self::Driver(_) | Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Validation(_) => "validation_error".to_string(),
            Self::NotFound(err) => err.code(),
            Self::Storage(_) | Self::Driver(_) | Self::Internal(_) => "internal_error".to_string(),
        }
    }

    /// Message safe to hand back to a client.
    ///
    /// Storage failures are reported generically; their source is only logged.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Structured details (the field issues of a validation failure).
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(err) => serde_json::to_value(&err.issues).ok(),
            _ => None,
        }
    }

    /// The `{code, message, details?}` body shared by every error surface.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.public_message(),
            details: self.details(),
        }
    }
}

/// Wire shape of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A payload was rejected by a schema validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>, issues: Vec<FieldIssue>) -> Self {
        Self {
            message: message.into(),
            issues,
        }
    }

    /// A validation error with a single issue on `path`.
    #[must_use]
    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        let issue = FieldIssue {
            path: path.into(),
            message: message.into(),
        };
        Self {
            message: format!("invalid {}", issue.path),
            issues: vec![issue],
        }
    }
}

/// One field-level problem reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// JSON pointer to the offending value (empty for the root).
    pub path: String,
    pub message: String,
}

/// A record was not found by id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Collection name, e.g. `devices`.
    pub entity: String,
    pub id: String,
}

impl NotFoundError {
    #[must_use]
    pub fn new(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `<entity>.not_found`
    #[must_use]
    pub fn code(&self) -> String {
        format!("{}.not_found", self.entity)
    }
}

/// Failures raised by device drivers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// No driver is registered for the device's driver kind.
    #[error("no driver registered for kind {0:?}")]
    UnknownKind(String),

    /// The device address lacks what the driver needs.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// The device could not be read or written.
    #[error("driver failure: {0}")]
    Failed(String),
}
