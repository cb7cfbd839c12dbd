//! AWS SDK client setup.

use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{IndexStatus as SdkIndexStatus, TableStatus as SdkTableStatus};
use aws_sdk_dynamodb::Client;

use crate::config::Config;
use crate::provision::{IndexState, IndexStatus, ProvisionError, Result, TableState, TableStatus};

/// Creates a DynamoDB client for the configured region and endpoint.
pub async fn create_client(config: &Config) -> Client {
    let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
    }

    let sdk_config = sdk_config_loader.load().await;
    Client::new(&sdk_config)
}

/// Fetches current table state, returns None if table doesn't exist.
pub async fn get_table_state(client: &Client, table_name: &str) -> Result<Option<TableState>> {
    let response = match client.describe_table().table_name(table_name).send().await {
        Ok(response) => response,
        Err(err) => {
            return match err.into_service_error() {
                DescribeTableError::ResourceNotFoundException(_) => Ok(None),
                err => Err(ProvisionError::AwsSdk(err.to_string())),
            };
        }
    };

    let Some(table) = response.table() else {
        return Ok(None);
    };

    let gsis = table
        .global_secondary_indexes()
        .iter()
        .map(|gsi| IndexState {
            name: gsi.index_name().unwrap_or_default().to_string(),
            status: match gsi.index_status() {
                Some(SdkIndexStatus::Creating) => IndexStatus::Creating,
                Some(SdkIndexStatus::Updating) => IndexStatus::Updating,
                Some(SdkIndexStatus::Deleting) => IndexStatus::Deleting,
                _ => IndexStatus::Active,
            },
        })
        .collect();

    let lsis = table
        .local_secondary_indexes()
        .iter()
        .filter_map(|lsi| lsi.index_name().map(str::to_string))
        .collect();

    let status = match table.table_status() {
        Some(SdkTableStatus::Creating) => TableStatus::Creating,
        Some(SdkTableStatus::Updating) => TableStatus::Updating,
        Some(SdkTableStatus::Deleting) => TableStatus::Deleting,
        _ => TableStatus::Active,
    };

    Ok(Some(TableState { status, gsis, lsis }))
}
