use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::CodecError;

/// Errors returned by store, query and scan operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{schema} not found: {key}")]
    NotFound { schema: String, key: String },
    #[error("{schema} already exists: {key}")]
    AlreadyExists { schema: String, key: String },
    #[error("Cannot encode field '{field}': {reason}")]
    Encoding { field: String, reason: String },
    #[error("Cannot decode field '{field}': {reason}")]
    Decoding { field: String, reason: String },
    #[error("Query on {index} is missing hash key component '{field}'")]
    MissingHashKey { index: String, field: String },
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Index {index} is a global secondary index and cannot be read consistently")]
    InconsistentReadOnGsi { index: String },
    #[error("Invalid predicate on '{field}': {reason}")]
    InvalidPredicate { field: String, reason: String },
    #[error("{schema} has no index named '{index}'")]
    UnknownIndex { schema: String, index: String },
    #[error("Invalid record, field '{field}': {reason}")]
    InvalidRecord { field: String, reason: String },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for data-access operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::AlreadyExists { .. } => "already_exists",
            Error::Encoding { .. } => "encoding",
            Error::Decoding { .. } => "decoding",
            Error::MissingHashKey { .. } => "missing_hash_key",
            Error::InvalidCursor(_) => "invalid_cursor",
            Error::InconsistentReadOnGsi { .. } => "inconsistent_read_on_gsi",
            Error::InvalidPredicate { .. } => "invalid_predicate",
            Error::UnknownIndex { .. } => "unknown_index",
            Error::InvalidRecord { .. } => "invalid_record",
            Error::Cancelled => "cancelled",
            Error::DeadlineExceeded => "deadline_exceeded",
            Error::Backend(_) => "backend",
        }
    }

    /// Whether the error was raised before reaching the backend because the
    /// request itself was invalid.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Encoding { .. }
                | Error::MissingHashKey { .. }
                | Error::InvalidCursor(_)
                | Error::InconsistentReadOnGsi { .. }
                | Error::InvalidPredicate { .. }
                | Error::UnknownIndex { .. }
                | Error::InvalidRecord { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<CodecError> for Error {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Encoding { field, reason } => Error::Encoding { field, reason },
            CodecError::Decoding { field, reason } => Error::Decoding { field, reason },
            CodecError::InvalidRecord { field, reason } => Error::InvalidRecord { field, reason },
        }
    }
}
