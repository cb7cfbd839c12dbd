//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `BackendError` from `dynamap_core`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use dynamap_core::BackendError;

/// Map a PutItem SDK error to BackendError.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => BackendError::ConditionFailed,
        err => BackendError::other("PutItem", err),
    }
}

/// Map a GetItem SDK error to BackendError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> BackendError {
    BackendError::other("GetItem", err.into_service_error())
}

/// Map a DeleteItem SDK error to BackendError.
pub fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
) -> BackendError {
    BackendError::other("DeleteItem", err.into_service_error())
}

/// Map a Query SDK error to BackendError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> BackendError {
    BackendError::other("Query", err.into_service_error())
}

/// Map a Scan SDK error to BackendError.
pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
) -> BackendError {
    BackendError::other("Scan", err.into_service_error())
}
