//! The async boundary with the storage SDK.
//!
//! Inputs and outputs mirror the DynamoDB item API closely enough that the
//! SDK adapter is a field-by-field translation.

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::Item;
use crate::query::KeyCondition;

/// Errors reported by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A conditional write was rejected.
    #[error("Conditional check failed")]
    ConditionFailed,
    /// Any other failure, with the source preserved.
    #[error("{operation} failed: {source}")]
    Other {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BackendError {
    pub fn other(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BackendError::Other {
            operation,
            source: source.into(),
        }
    }
}

/// Condition attached to a put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    /// `attribute_not_exists(<attribute>)`
    AttributeNotExists(String),
}

#[derive(Debug, Clone)]
pub struct PutItemInput {
    pub table: String,
    pub item: Item,
    pub condition: Option<PutCondition>,
}

#[derive(Debug, Clone)]
pub struct GetItemInput {
    pub table: String,
    pub key: Item,
    pub consistent_read: bool,
}

#[derive(Debug, Clone)]
pub struct DeleteItemInput {
    pub table: String,
    pub key: Item,
}

#[derive(Debug, Clone)]
pub struct QueryInput {
    pub table: String,
    /// Secondary index name; `None` queries the table itself.
    pub index: Option<String>,
    pub key_condition: KeyCondition,
    pub scan_forward: bool,
    pub consistent_read: bool,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ScanInput {
    pub table: String,
    pub index: Option<String>,
    pub consistent_read: bool,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<u32>,
}

/// One page of query or scan results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    /// Continuation token; `None` when the result set is exhausted.
    pub last_evaluated_key: Option<Item>,
}

/// Storage backend.
///
/// Implementations perform exactly one round-trip per call and never retry.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn put_item(&self, input: PutItemInput) -> Result<(), BackendError>;

    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, BackendError>;

    async fn delete_item(&self, input: DeleteItemInput) -> Result<(), BackendError>;

    async fn query(&self, input: QueryInput) -> Result<Page, BackendError>;

    async fn scan(&self, input: ScanInput) -> Result<Page, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_display_keeps_source() {
        let error = BackendError::other("PutItem", "throttled");
        assert_eq!(error.to_string(), "PutItem failed: throttled");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_condition_failed_display() {
        assert_eq!(
            BackendError::ConditionFailed.to_string(),
            "Conditional check failed"
        );
    }
}
