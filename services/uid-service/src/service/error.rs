//! Domain errors raised by the service layer.

use thiserror::Error;
use uid_core::SchemaError;

use crate::store::DbError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A value failed segment or field validation.
    #[error(transparent)]
    InvalidValue(#[from] SchemaError),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The resource is in a state that does not allow the change.
    #[error("{0}")]
    Mutability(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Maps a unique violation on write to `Conflict`, passing other storage
    /// failures through.
    pub fn on_write(err: DbError, conflict: impl FnOnce() -> String) -> Self {
        match err {
            DbError::UniqueViolation(_) => ServiceError::Conflict(conflict()),
            other => ServiceError::Store(other),
        }
    }
}
