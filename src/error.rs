// 🚦 Error taxonomy for the refresh pipeline and the query layer
//
// Four kinds, no more: fetch, validation, storage, not-found.
// Callers dispatch on `kind()` (or match the enum directly), never on messages.

use std::collections::BTreeMap;
use thiserror::Error;

/// Discriminant of a [`CountryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FetchFailure,
    ValidationFailure,
    StorageFailure,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FetchFailure => "fetch-failure",
            ErrorKind::ValidationFailure => "validation-failure",
            ErrorKind::StorageFailure => "storage-failure",
            ErrorKind::NotFound => "not-found",
        }
    }
}

#[derive(Debug, Error)]
pub enum CountryError {
    /// An external source was unreachable, answered with a non-success
    /// status, or sent a body we could not decode.
    #[error("failed to fetch {source_name}: {message}")]
    Fetch {
        source_name: &'static str,
        message: String,
    },

    /// A new country failed insert-path validation. `details` maps
    /// field name to message.
    #[error("validation failed for country '{country}'")]
    Validation {
        country: String,
        details: BTreeMap<String, String>,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("country not found: {0}")]
    NotFound(String),
}

impl CountryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CountryError::Fetch { .. } => ErrorKind::FetchFailure,
            CountryError::Validation { .. } => ErrorKind::ValidationFailure,
            CountryError::Storage(_) => ErrorKind::StorageFailure,
            CountryError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn fetch(source_name: &'static str, message: impl Into<String>) -> Self {
        CountryError::Fetch {
            source_name,
            message: message.into(),
        }
    }
}

pub type CountryResult<T> = Result<T, CountryError>;
