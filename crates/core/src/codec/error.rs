use thiserror::Error;

/// Errors raised while mapping records to and from their stored form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Cannot encode field '{field}': {reason}")]
    Encoding { field: String, reason: String },
    #[error("Cannot decode field '{field}': {reason}")]
    Decoding { field: String, reason: String },
    #[error("Invalid record, field '{field}': {reason}")]
    InvalidRecord { field: String, reason: String },
}

impl CodecError {
    pub(crate) fn encoding(field: &str, reason: impl Into<String>) -> Self {
        CodecError::Encoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decoding(field: &str, reason: impl Into<String>) -> Self {
        CodecError::Decoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_record(field: &str, reason: impl Into<String>) -> Self {
        CodecError::InvalidRecord {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
